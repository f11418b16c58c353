use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::table::Table;
use super::{StoreClient, StoreResult};
use crate::domain::{ChatId, Item, ItemCreate, ItemId, ItemKey, JobHandle, Order, OrderCreate, OrderId, UserId};
use crate::error::StoreError;

pub type Response<T> = crate::actor_framework::Response<T, StoreError>;

#[derive(Debug)]
pub enum StoreRequest {
    CreateOrder {
        params: OrderCreate,
        as_of: DateTime<Utc>,
        respond_to: Response<Order>,
    },
    GetActiveOrderForChat {
        chat_id: ChatId,
        as_of: DateTime<Utc>,
        respond_to: Response<Option<Order>>,
    },
    GetOrderById {
        id: OrderId,
        respond_to: Response<Option<Order>>,
    },
    DeactivateOrder {
        id: OrderId,
        respond_to: Response<bool>,
    },
    SetReminderHandle {
        id: OrderId,
        handle: Option<JobHandle>,
        respond_to: Response<()>,
    },
    SetFinalizeHandle {
        id: OrderId,
        handle: Option<JobHandle>,
        respond_to: Response<()>,
    },
    GetItem {
        key: ItemKey,
        respond_to: Response<Option<Item>>,
    },
    CreateItem {
        params: ItemCreate,
        respond_to: Response<Item>,
    },
    UpdateItemQuantity {
        key: ItemKey,
        delta: u32,
        respond_to: Response<Item>,
    },
    DeleteItemByOwner {
        item_id: ItemId,
        user_id: UserId,
        as_of: DateTime<Utc>,
        respond_to: Response<Item>,
    },
    ListItemsByOrder {
        order_id: OrderId,
        respond_to: Response<Vec<Item>>,
    },
    Shutdown,
}

/// In-memory order store actor. Owns both tables and the item identity index.
pub struct StoreService {
    receiver: mpsc::Receiver<StoreRequest>,
    orders: Table<Order>,
    items: Table<Item>,
    item_keys: HashMap<ItemKey, ItemId>,
}

impl StoreService {
    pub fn new(buffer_size: usize, call_timeout: std::time::Duration) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            orders: Table::default(),
            items: Table::default(),
            item_keys: HashMap::new(),
        };
        (service, StoreClient::new(sender, call_timeout))
    }

    #[instrument(name = "store_service", skip(self))]
    pub async fn run(mut self) {
        info!("StoreService starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::CreateOrder { params, as_of, respond_to } => {
                    let _ = respond_to.send(self.handle_create_order(params, as_of));
                }
                StoreRequest::GetActiveOrderForChat { chat_id, as_of, respond_to } => {
                    let _ = respond_to.send(Ok(self.active_order(chat_id, as_of).cloned()));
                }
                StoreRequest::GetOrderById { id, respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.get(id).cloned()));
                }
                StoreRequest::DeactivateOrder { id, respond_to } => {
                    let _ = respond_to.send(self.handle_deactivate_order(id));
                }
                StoreRequest::SetReminderHandle { id, handle, respond_to } => {
                    let _ = respond_to.send(self.with_order(id, |order| order.reminder_handle = handle));
                }
                StoreRequest::SetFinalizeHandle { id, handle, respond_to } => {
                    let _ = respond_to.send(self.with_order(id, |order| order.finalize_handle = handle));
                }
                StoreRequest::GetItem { key, respond_to } => {
                    let item = self.item_keys.get(&key).and_then(|id| self.items.get(*id)).cloned();
                    let _ = respond_to.send(Ok(item));
                }
                StoreRequest::CreateItem { params, respond_to } => {
                    let _ = respond_to.send(self.handle_create_item(params));
                }
                StoreRequest::UpdateItemQuantity { key, delta, respond_to } => {
                    let _ = respond_to.send(self.handle_update_item_quantity(key, delta));
                }
                StoreRequest::DeleteItemByOwner { item_id, user_id, as_of, respond_to } => {
                    let _ = respond_to.send(self.handle_delete_item_by_owner(item_id, user_id, as_of));
                }
                StoreRequest::ListItemsByOrder { order_id, respond_to } => {
                    let items = self.items.values().filter(|i| i.order_id == order_id).cloned().collect();
                    let _ = respond_to.send(Ok(items));
                }
                StoreRequest::Shutdown => {
                    info!("StoreService shutting down");
                    break;
                }
            }
        }

        info!("StoreService stopped");
    }

    fn active_order(&self, chat_id: ChatId, as_of: DateTime<Utc>) -> Option<&Order> {
        self.orders
            .values()
            .find(|order| order.chat_id == chat_id && order.is_open_at(as_of))
    }

    #[instrument(fields(chat_id = params.chat_id), skip(self, params))]
    fn handle_create_order(&mut self, params: OrderCreate, as_of: DateTime<Utc>) -> StoreResult<Order> {
        if let Some(existing) = self.active_order(params.chat_id, as_of) {
            debug!(existing_order_id = existing.id, "Chat already has an active order");
            return Err(StoreError::ActiveOrderExists(existing.clone()));
        }

        for stale in self
            .orders
            .values_mut()
            .filter(|order| order.chat_id == params.chat_id && order.active)
        {
            warn!(order_id = stale.id, expiry_at = %stale.expiry_at, "Deactivating stale order past its expiry");
            stale.active = false;
        }

        let order = self.orders.insert(params).clone();
        info!(order_id = order.id, "Order created");
        Ok(order)
    }

    fn handle_deactivate_order(&mut self, id: OrderId) -> StoreResult<bool> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;
        let was_active = order.active;
        order.active = false;
        debug!(order_id = id, was_active, "Order deactivated");
        Ok(was_active)
    }

    fn with_order(&mut self, id: OrderId, apply: impl FnOnce(&mut Order)) -> StoreResult<()> {
        let order = self
            .orders
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;
        apply(order);
        Ok(())
    }

    fn handle_create_item(&mut self, params: ItemCreate) -> StoreResult<Item> {
        let key = params.key();
        if let Some(&existing_id) = self.item_keys.get(&key) {
            if let Some(existing) = self.items.get_mut(existing_id) {
                existing.quantity = existing
                    .quantity
                    .checked_add(params.quantity)
                    .ok_or_else(|| StoreError::QuantityOverflow(format!("item {}", existing_id)))?;
                debug!(item_id = existing_id, quantity = existing.quantity, "Merged insert into existing item");
                return Ok(existing.clone());
            }
        }

        let item = self.items.insert(params).clone();
        self.item_keys.insert(key, item.id);
        Ok(item)
    }

    fn handle_update_item_quantity(&mut self, key: ItemKey, delta: u32) -> StoreResult<Item> {
        let item = self
            .item_keys
            .get(&key)
            .and_then(|id| self.items.get_mut(*id))
            .ok_or_else(|| StoreError::NotFound(format!("item '{}' of user {}", key.lower_name, key.user_id)))?;
        item.quantity = item
            .quantity
            .checked_add(delta)
            .ok_or_else(|| StoreError::QuantityOverflow(format!("item {}", item.id)))?;
        Ok(item.clone())
    }

    fn handle_delete_item_by_owner(&mut self, item_id: ItemId, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Item> {
        let deletable = self.items.get(item_id).is_some_and(|item| {
            item.user_id == user_id
                && self.orders.get(item.order_id).is_some_and(|order| order.is_open_at(as_of))
        });
        if !deletable {
            return Err(StoreError::NotFound(format!("item {}", item_id)));
        }

        let item = self
            .items
            .remove(item_id)
            .ok_or_else(|| StoreError::NotFound(format!("item {}", item_id)))?;
        self.item_keys.remove(&item.key());
        Ok(item)
    }
}
