use serde::{Deserialize, Serialize};

use super::{ItemId, OrderId, UserId};

/// One (user, name, quantity) line contributed to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub user_name: String,
    /// Name as first typed; identity uses the folded form.
    pub name: String,
    pub quantity: u32,
}

/// Payload for inserting a new item.
#[derive(Debug, Clone)]
pub struct ItemCreate {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub user_name: String,
    pub name: String,
    pub quantity: u32,
}

/// Identity of an item within an order: `(order, user, lower(name))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lower_name: String,
}

impl ItemKey {
    pub fn new(order_id: OrderId, user_id: UserId, name: &str) -> Self {
        Self {
            order_id,
            user_id,
            lower_name: fold_name(name),
        }
    }
}

impl Item {
    pub fn from_create(id: ItemId, params: ItemCreate) -> Self {
        Self {
            id,
            order_id: params.order_id,
            user_id: params.user_id,
            user_name: params.user_name,
            name: params.name,
            quantity: params.quantity,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.order_id, self.user_id, &self.name)
    }
}

impl ItemCreate {
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.order_id, self.user_id, &self.name)
    }
}

/// Case-folded form of an item name.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}
