//! Outbound side: what the bot says and how it is marked up.
//!
//! [`NotificationSink`] is the only way order logic talks back to a chat.
//! Summaries travel as plain [`Summary`] data; the sink picks the markup.

mod outbox;
mod render;
pub mod text;

pub use outbox::{OutboundMessage, OutboxSink};
pub use render::RenderMode;

use async_trait::async_trait;

use crate::domain::{ChatId, Summary};
use crate::error::NotifyError;

/// One button of a selectable prompt. `data` comes back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub data: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_summary(&self, chat_id: ChatId, summary: &Summary) -> Result<(), NotifyError>;

    async fn send_error(&self, chat_id: ChatId, reason: &str) -> Result<(), NotifyError>;

    async fn send_selectable(&self, chat_id: ChatId, prompt: &str, options: Vec<SelectOption>) -> Result<(), NotifyError>;

    /// Confirmations and help.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError>;
}
