//! Durable CRUD for orders and items.
//!
//! [`OrderStore`] is the contract `OrderService` consumes. [`StoreService`] is
//! the in-process implementation: an actor owning both tables, so every
//! request is applied atomically with respect to every other request. The
//! single-active-order invariant and item identity uniqueness are enforced
//! here rather than by callers.

mod client;
mod service;
mod table;

pub use client::StoreClient;
pub use service::{StoreRequest, StoreService};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ChatId, Item, ItemCreate, ItemId, ItemKey, JobHandle, Order, OrderCreate, OrderId, UserId};
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an active order unless the chat already has one open at `as_of`
    /// (`ActiveOrderExists`). Active rows already past expiry are deactivated
    /// in the same step.
    async fn create_order(&self, params: OrderCreate, as_of: DateTime<Utc>) -> StoreResult<Order>;

    /// The chat's active order whose expiry is after `as_of`.
    async fn get_active_order_for_chat(&self, chat_id: ChatId, as_of: DateTime<Utc>) -> StoreResult<Option<Order>>;

    async fn get_order_by_id(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Returns whether the order was active before the call.
    async fn deactivate_order(&self, id: OrderId) -> StoreResult<bool>;

    async fn set_reminder_handle(&self, id: OrderId, handle: Option<JobHandle>) -> StoreResult<()>;

    async fn set_finalize_handle(&self, id: OrderId, handle: Option<JobHandle>) -> StoreResult<()>;

    async fn get_item(&self, key: ItemKey) -> StoreResult<Option<Item>>;

    /// Inserts an item. If the identity key already exists the quantity is
    /// added to it instead, so racing inserts never duplicate a row.
    async fn create_item(&self, params: ItemCreate) -> StoreResult<Item>;

    /// Adds `delta` to the item's quantity in one step, so concurrent adds
    /// never lose an increment. `QuantityOverflow` leaves the row unchanged.
    async fn update_item_quantity(&self, key: ItemKey, delta: u32) -> StoreResult<Item>;

    /// Deletes an item owned by `user_id` on an order still open at `as_of`.
    /// Missing items, items of other users and items of closed or expired
    /// orders are all `NotFound`.
    async fn delete_item_by_owner(&self, item_id: ItemId, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Item>;

    /// Items in insertion order.
    async fn list_items_by_order(&self, order_id: OrderId) -> StoreResult<Vec<Item>>;
}
