use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChatId, OrderId};

/// Cancellation token for a scheduled trigger: when it runs and which job it is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    /// Unix timestamp (seconds) the job is due.
    pub run_at: i64,
    pub job_id: String,
}

/// A time-boxed collection request scoped to one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub chat_id: ChatId,
    pub title: String,
    pub expiry_at: DateTime<Utc>,
    pub active: bool,
    /// Present only while a reminder trigger may still be pending.
    pub reminder_handle: Option<JobHandle>,
    /// Present only while a finalize trigger may still be pending.
    pub finalize_handle: Option<JobHandle>,
}

/// Payload for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub chat_id: ChatId,
    pub title: String,
    pub expiry_at: DateTime<Utc>,
}

impl Order {
    /// Builds a freshly opened order from creation parameters.
    ///
    /// # Notes
    /// The order starts active with no handles; the service attaches them
    /// once the triggers are scheduled.
    pub fn from_create(id: OrderId, params: OrderCreate) -> Self {
        Self {
            id,
            chat_id: params.chat_id,
            title: params.title,
            expiry_at: params.expiry_at,
            active: true,
            reminder_handle: None,
            finalize_handle: None,
        }
    }

    /// Whether this order still accepts items at `as_of`.
    pub fn is_open_at(&self, as_of: DateTime<Utc>) -> bool {
        self.active && self.expiry_at > as_of
    }

    /// Handles that may still point at a pending trigger, reminder first.
    pub fn pending_handles(&self) -> impl Iterator<Item = &JobHandle> {
        self.reminder_handle
            .iter()
            .chain(self.finalize_handle.iter())
    }
}
