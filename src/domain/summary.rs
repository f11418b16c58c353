//! Consolidated order summaries.
//!
//! Two views over the same items: the attribution listing keeps every line in
//! insertion order with its original casing, the consolidated listing sums
//! quantities per folded name across all users in first-seen order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{fold_name, Item, Order, UserId};

/// Why a summary is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryKind {
    /// The order changed and is still collecting.
    Update,
    /// Fired shortly before the deadline.
    Reminder,
    /// The order closed, by deadline or cancellation.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionLine {
    pub user_id: UserId,
    pub user_name: String,
    pub quantity: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedLine {
    /// Folded name.
    pub name: String,
    pub quantity: u32,
}

/// Plain data handed to a `NotificationSink`; rendering happens there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub order: Order,
    pub kind: SummaryKind,
    pub attribution: Vec<AttributionLine>,
    pub consolidated: Vec<ConsolidatedLine>,
}

impl Summary {
    /// Builds both views. `items` must be in insertion order.
    pub fn build(order: Order, kind: SummaryKind, items: &[Item]) -> Self {
        let attribution = items
            .iter()
            .map(|item| AttributionLine {
                user_id: item.user_id,
                user_name: item.user_name.clone(),
                quantity: item.quantity,
                name: item.name.clone(),
            })
            .collect();

        Self {
            order,
            kind,
            attribution,
            consolidated: consolidate(items),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attribution.is_empty()
    }
}

/// Sums quantities per folded name, preserving first-seen order.
pub fn consolidate(items: &[Item]) -> Vec<ConsolidatedLine> {
    let mut lines: Vec<ConsolidatedLine> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let name = fold_name(&item.name);
        match index.get(&name) {
            Some(&at) => {
                lines[at].quantity = lines[at].quantity.saturating_add(item.quantity);
            }
            None => {
                index.insert(name.clone(), lines.len());
                lines.push(ConsolidatedLine {
                    name,
                    quantity: item.quantity,
                });
            }
        }
    }

    lines
}
