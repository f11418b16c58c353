use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use super::{Callback, Command, CommandRegistry};
use crate::domain::{ChatId, Summary, SummaryKind, UserId};
use crate::error::{NotifyError, OrderError};
use crate::notify::{text, NotificationSink, SelectOption};
use crate::order_service::OrderService;

/// Who sent an inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub name: String,
}

impl ChatUser {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Executes parsed commands against [`OrderService`] and answers through the
/// sink. Every outcome, including failure, ends in a reply.
pub struct Dispatcher {
    registry: CommandRegistry,
    orders: Arc<OrderService>,
    sink: Arc<dyn NotificationSink>,
}

impl Dispatcher {
    pub fn new(orders: Arc<OrderService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            orders,
            sink,
        }
    }

    #[instrument(skip(self, from, message), fields(user_id = from.id))]
    pub async fn handle_message(&self, chat_id: ChatId, from: &ChatUser, message: &str) {
        let Some(parsed) = self.registry.parse(message) else {
            debug!("Ignoring text that is not a command");
            return;
        };

        let result = match parsed {
            Ok(command) => {
                debug!(?command, "Dispatching command");
                self.execute(chat_id, from, command).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reply_error(chat_id, &e, text::NO_ACTIVE_ORDER).await;
        }
    }

    #[instrument(skip(self, from), fields(user_id = from.id))]
    pub async fn handle_callback(&self, chat_id: ChatId, from: &ChatUser, data: &str) {
        let Some(parsed) = self.registry.parse_callback(data) else {
            debug!("Ignoring unknown callback");
            return;
        };

        let result = match parsed {
            Ok(callback) => self.execute_callback(chat_id, from, callback).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reply_error(chat_id, &e, text::INVALID_ITEM).await;
        }
    }

    async fn execute(&self, chat_id: ChatId, from: &ChatUser, command: Command) -> Result<(), OrderError> {
        match command {
            Command::Help => {
                self.say(chat_id, &text::help()).await;
            }
            Command::OpenOrder { deadline, title } => {
                let opened = self.orders.open_order(chat_id, &title, deadline).await?;
                let local = opened.order.expiry_at.with_timezone(&self.orders.timezone());
                let reply = text::taking_orders(
                    &opened.order.title,
                    &local.format("%H:%M").to_string(),
                    opened.is_tomorrow,
                );
                self.say(chat_id, &reply).await;
            }
            Command::CloseOrder => {
                let order = self.orders.cancel_order(chat_id).await?;
                let summary = self.orders.summarize(order.id, SummaryKind::Closed).await?;
                self.show(&summary).await;
                self.say(chat_id, text::ORDER_CANCELLED).await;
            }
            Command::AddItem { quantity, name } => {
                let order = self.orders.active_order(chat_id).await?;
                self.orders.add_item(order.id, from.id, &from.name, &name, quantity).await?;
                let summary = self.orders.summarize(order.id, SummaryKind::Update).await?;
                self.show(&summary).await;
            }
            Command::PickItemToRemove => {
                let items = self.orders.list_user_items(chat_id, from.id).await?;
                if items.is_empty() {
                    self.say(chat_id, text::NO_ITEMS).await;
                    return Ok(());
                }

                let mut options: Vec<SelectOption> = items
                    .iter()
                    .map(|item| {
                        SelectOption::new(format!("{} x {}", item.quantity, item.name), format!("/delete {}", item.id))
                    })
                    .collect();
                options.push(SelectOption::new("Cancel", "/cancel"));

                let sent = self.sink.send_selectable(chat_id, text::SELECT_ITEM_TO_REMOVE, options).await;
                self.check_delivery(chat_id, sent);
            }
        }
        Ok(())
    }

    async fn execute_callback(&self, chat_id: ChatId, from: &ChatUser, callback: Callback) -> Result<(), OrderError> {
        match callback {
            Callback::RemoveItem(item_id) => {
                let item = self.orders.remove_item(item_id, from.id).await?;
                self.say(chat_id, &text::removed_item(item.quantity, &item.name)).await;
                let summary = self.orders.summarize(item.order_id, SummaryKind::Update).await?;
                self.show(&summary).await;
            }
            Callback::AbandonRemoval => {
                self.say(chat_id, text::REMOVAL_ABANDONED).await;
            }
        }
        Ok(())
    }

    async fn reply_error(&self, chat_id: ChatId, err: &OrderError, not_found: &str) {
        let reply = match err {
            OrderError::InvalidInput(guidance) => guidance.clone(),
            OrderError::Conflict { title } => text::existing_order(title),
            OrderError::NotFound(what) => {
                debug!(what = %what, "Nothing to act on");
                not_found.to_string()
            }
            OrderError::Transient(reason) => {
                error!(chat_id, reason = %reason, "Command failed");
                text::GENERIC_FAILURE.to_string()
            }
        };
        let sent = self.sink.send_error(chat_id, &reply).await;
        self.check_delivery(chat_id, sent);
    }

    async fn say(&self, chat_id: ChatId, reply: &str) {
        let sent = self.sink.send_text(chat_id, reply).await;
        self.check_delivery(chat_id, sent);
    }

    async fn show(&self, summary: &Summary) {
        let sent = self.sink.send_summary(summary.order.chat_id, summary).await;
        self.check_delivery(summary.order.chat_id, sent);
    }

    fn check_delivery(&self, chat_id: ChatId, sent: Result<(), NotifyError>) {
        if let Err(e) = sent {
            warn!(chat_id, error = %e, "Reply could not be delivered");
        }
    }
}
