use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::service::{Response, StoreRequest};
use super::{OrderStore, StoreResult};
use crate::actor_framework::request;
use crate::domain::{ChatId, Item, ItemCreate, ItemId, ItemKey, JobHandle, Order, OrderCreate, OrderId, UserId};
use crate::error::StoreError;

/// Client for [`super::StoreService`]. Every call is bounded by `call_timeout`;
/// a closed, dropped or slow actor surfaces as `StoreError::Unavailable`.
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    call_timeout: Duration,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>, call_timeout: Duration) -> Self {
        Self { sender, call_timeout }
    }

    async fn call<T>(&self, build: impl FnOnce(Response<T>) -> StoreRequest) -> StoreResult<T> {
        debug!("Sending request");
        request(&self.sender, self.call_timeout, build, |reason| {
            StoreError::Unavailable(format!("store {}", reason))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Unavailable("store actor closed".to_string()))
    }
}

#[async_trait]
impl OrderStore for StoreClient {
    #[instrument(fields(chat_id = params.chat_id), skip(self, params))]
    async fn create_order(&self, params: OrderCreate, as_of: DateTime<Utc>) -> StoreResult<Order> {
        self.call(|respond_to| StoreRequest::CreateOrder { params, as_of, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn get_active_order_for_chat(&self, chat_id: ChatId, as_of: DateTime<Utc>) -> StoreResult<Option<Order>> {
        self.call(|respond_to| StoreRequest::GetActiveOrderForChat { chat_id, as_of, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn get_order_by_id(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.call(|respond_to| StoreRequest::GetOrderById { id, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn deactivate_order(&self, id: OrderId) -> StoreResult<bool> {
        self.call(|respond_to| StoreRequest::DeactivateOrder { id, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_reminder_handle(&self, id: OrderId, handle: Option<JobHandle>) -> StoreResult<()> {
        self.call(|respond_to| StoreRequest::SetReminderHandle { id, handle, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_finalize_handle(&self, id: OrderId, handle: Option<JobHandle>) -> StoreResult<()> {
        self.call(|respond_to| StoreRequest::SetFinalizeHandle { id, handle, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn get_item(&self, key: ItemKey) -> StoreResult<Option<Item>> {
        self.call(|respond_to| StoreRequest::GetItem { key, respond_to }).await
    }

    #[instrument(fields(order_id = params.order_id, user_id = params.user_id), skip(self, params))]
    async fn create_item(&self, params: ItemCreate) -> StoreResult<Item> {
        self.call(|respond_to| StoreRequest::CreateItem { params, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn update_item_quantity(&self, key: ItemKey, delta: u32) -> StoreResult<Item> {
        self.call(|respond_to| StoreRequest::UpdateItemQuantity { key, delta, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn delete_item_by_owner(&self, item_id: ItemId, user_id: UserId, as_of: DateTime<Utc>) -> StoreResult<Item> {
        self.call(|respond_to| StoreRequest::DeleteItemByOwner { item_id, user_id, as_of, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn list_items_by_order(&self, order_id: OrderId) -> StoreResult<Vec<Item>> {
        self.call(|respond_to| StoreRequest::ListItemsByOrder { order_id, respond_to }).await
    }
}
