//! Order lifecycle: open, collect, remove, cancel and finalize.
//!
//! `OrderService` owns every state transition of an order. It talks to an
//! [`OrderStore`] for rows and a [`Scheduler`] for the reminder and finalize
//! triggers; it never renders or delivers anything.

mod jobs;

pub use jobs::FinalizeJobHandler;

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::domain::{
    ChatId, Deadline, Item, ItemCreate, ItemId, ItemKey, JobHandle, Order, OrderCreate, OrderId, Summary,
    SummaryKind, UserId,
};
use crate::error::{OrderError, StoreError};
use crate::scheduler::{CancelOutcome, Job, Scheduler};
use crate::store::OrderStore;

/// Orders closing further out than this get a reminder.
pub const REMINDER_THRESHOLD_SECS: i64 = 600;
/// How long before the deadline the reminder fires.
pub const REMINDER_LEAD_SECS: i64 = 300;

/// A freshly opened order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedOrder {
    pub order: Order,
    /// The deadline had already passed today and rolled over.
    pub is_tomorrow: bool,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, scheduler: Arc<dyn Scheduler>, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            store,
            scheduler,
            clock,
            tz,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Opens an order for `chat_id` closing at `deadline` and schedules its
    /// triggers.
    ///
    /// If the order is persisted but a trigger cannot be scheduled, the order
    /// stays open and the caller gets `Transient`.
    #[instrument(skip(self, title, deadline), fields(deadline = %deadline))]
    pub async fn open_order(&self, chat_id: ChatId, title: &str, deadline: Deadline) -> Result<OpenedOrder, OrderError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(OrderError::InvalidInput("order title is empty".to_string()));
        }

        let now = self.clock.now();
        let resolved = deadline.resolve(now, self.tz)?;

        if let Some(existing) = self.store.get_active_order_for_chat(chat_id, now).await? {
            debug!(order_id = existing.id, "Chat already has an active order");
            return Err(OrderError::Conflict { title: existing.title });
        }

        let order = self
            .store
            .create_order(
                OrderCreate {
                    chat_id,
                    title: title.to_string(),
                    expiry_at: resolved.expiry_at,
                },
                now,
            )
            .await?;
        info!(order_id = order.id, expiry_at = %order.expiry_at, "Order opened");

        match self.schedule_triggers(order.clone()).await {
            Ok(order) => Ok(OpenedOrder {
                order,
                is_tomorrow: resolved.is_tomorrow,
            }),
            Err(e) => {
                error!(order_id = order.id, error = %e, "Order persisted but its triggers were not all scheduled");
                Err(OrderError::Transient(format!("order {} is open but not fully scheduled: {}", order.id, e)))
            }
        }
    }

    async fn schedule_triggers(&self, mut order: Order) -> Result<Order, OrderError> {
        let seconds_to_expiry = (order.expiry_at - self.clock.now()).num_seconds();

        if seconds_to_expiry > REMINDER_THRESHOLD_SECS {
            let handle = self
                .scheduler
                .enqueue_delayed(Job::reminder(order.id), seconds_to_expiry - REMINDER_LEAD_SECS)
                .await?;
            self.store.set_reminder_handle(order.id, Some(handle.clone())).await?;
            order.reminder_handle = Some(handle);
        }

        let handle = self.scheduler.enqueue_delayed(Job::finalize(order.id), seconds_to_expiry).await?;
        self.store.set_finalize_handle(order.id, Some(handle.clone())).await?;
        order.finalize_handle = Some(handle);

        debug!(
            order_id = order.id,
            seconds_to_expiry,
            reminder = order.reminder_handle.is_some(),
            "Triggers scheduled"
        );
        Ok(order)
    }

    /// Adds `delta` of `name` for a user, merging case-insensitively with
    /// what the user already has on the order.
    #[instrument(skip(self, user_name, name))]
    pub async fn add_item(
        &self,
        order_id: OrderId,
        user_id: UserId,
        user_name: &str,
        name: &str,
        delta: i64,
    ) -> Result<Item, OrderError> {
        let order = self.store.get_order_by_id(order_id).await?;
        if !order.is_some_and(|order| order.is_open_at(self.clock.now())) {
            return Err(OrderError::NotFound(format!("no active order {}", order_id)));
        }

        if delta <= 0 {
            return Err(OrderError::InvalidInput(format!("quantity must be positive, got {}", delta)));
        }
        let delta = u32::try_from(delta).map_err(|_| OrderError::InvalidInput(format!("quantity {} is too large", delta)))?;

        let name = name.trim();
        if name.is_empty() {
            return Err(OrderError::InvalidInput("item name is empty".to_string()));
        }

        let key = ItemKey::new(order_id, user_id, name);
        let existing = match self.store.get_item(key.clone()).await? {
            Some(_) => match self.store.update_item_quantity(key, delta).await {
                Ok(item) => Some(item),
                // Removed between the lookup and the increment.
                Err(StoreError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };
        let item = match existing {
            Some(item) => item,
            None => {
                self.store
                    .create_item(ItemCreate {
                        order_id,
                        user_id,
                        user_name: user_name.to_string(),
                        name: name.to_string(),
                        quantity: delta,
                    })
                    .await?
            }
        };

        debug!(item_id = item.id, quantity = item.quantity, "Item recorded");
        Ok(item)
    }

    /// Deletes one of the requesting user's items while the order is still
    /// open. Someone else's item is indistinguishable from a missing one.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: ItemId, user_id: UserId) -> Result<Item, OrderError> {
        let item = self.store.delete_item_by_owner(item_id, user_id, self.clock.now()).await?;
        debug!(order_id = item.order_id, "Item removed");
        Ok(item)
    }

    /// Closes the chat's active order early and withdraws its triggers.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, chat_id: ChatId) -> Result<Order, OrderError> {
        let mut order = self.active_order(chat_id).await?;

        if !self.store.deactivate_order(order.id).await? {
            return Err(OrderError::NotFound(format!("order {} already closed", order.id)));
        }
        order.active = false;
        info!(order_id = order.id, "Order cancelled");

        for handle in order.pending_handles() {
            self.withdraw(order.id, handle).await;
        }
        if order.reminder_handle.take().is_some() {
            if let Err(e) = self.store.set_reminder_handle(order.id, None).await {
                warn!(order_id = order.id, error = %e, "Could not clear reminder handle");
            }
        }
        if order.finalize_handle.take().is_some() {
            if let Err(e) = self.store.set_finalize_handle(order.id, None).await {
                warn!(order_id = order.id, error = %e, "Could not clear finalize handle");
            }
        }

        Ok(order)
    }

    /// Best-effort cancellation. A trigger that still fires finds the order
    /// closed.
    async fn withdraw(&self, order_id: OrderId, handle: &JobHandle) {
        match self.scheduler.cancel_delayed(handle).await {
            Ok(CancelOutcome::Cancelled) => debug!(order_id, job_id = %handle.job_id, "Trigger cancelled"),
            Ok(CancelOutcome::AlreadyGone) => {
                debug!(order_id, job_id = %handle.job_id, "Trigger already fired or gone")
            }
            Err(e) => warn!(order_id, job_id = %handle.job_id, error = %e, "Trigger cancellation failed"),
        }
    }

    /// Runs a due trigger. Reminders only read; the final trigger closes the
    /// order and may run any number of times.
    #[instrument(skip(self))]
    pub async fn finalize_order(&self, order_id: OrderId, is_reminder: bool) -> Result<Summary, OrderError> {
        let mut order = self
            .store
            .get_order_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;

        let kind = if is_reminder {
            SummaryKind::Reminder
        } else {
            if self.store.deactivate_order(order_id).await? {
                info!("Order closed at deadline");
            } else {
                debug!("Order was already closed");
            }
            order.active = false;
            SummaryKind::Closed
        };

        let items = self.store.list_items_by_order(order_id).await?;
        Ok(Summary::build(order, kind, &items))
    }

    /// Snapshot of an order and its items.
    pub async fn summarize(&self, order_id: OrderId, kind: SummaryKind) -> Result<Summary, OrderError> {
        let order = self
            .store
            .get_order_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;
        let items = self.store.list_items_by_order(order_id).await?;
        Ok(Summary::build(order, kind, &items))
    }

    pub async fn active_order(&self, chat_id: ChatId) -> Result<Order, OrderError> {
        self.store
            .get_active_order_for_chat(chat_id, self.clock.now())
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("no active order in chat {}", chat_id)))
    }

    /// The user's items on the chat's active order, in insertion order.
    pub async fn list_user_items(&self, chat_id: ChatId, user_id: UserId) -> Result<Vec<Item>, OrderError> {
        let order = self.active_order(chat_id).await?;
        let items = self.store.list_items_by_order(order.id).await?;
        Ok(items.into_iter().filter(|item| item.user_id == user_id).collect())
    }
}
