use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::{NotificationSink, RenderMode, SelectOption};
use crate::clock::Clock;
use crate::domain::{ChatId, Summary};
use crate::error::NotifyError;

/// A message ready for the chat transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    /// Markup `text` is written in; `None` for plain text.
    pub markup: Option<RenderMode>,
    pub options: Vec<SelectOption>,
}

impl OutboundMessage {
    fn plain(chat_id: ChatId, text: &str) -> Self {
        Self {
            chat_id,
            text: text.to_string(),
            markup: None,
            options: Vec::new(),
        }
    }
}

/// Renders into an outbound channel drained by whatever talks to the chat
/// platform.
#[derive(Clone)]
pub struct OutboxSink {
    outbox: mpsc::Sender<OutboundMessage>,
    mode: RenderMode,
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl OutboxSink {
    pub fn new(buffer_size: usize, mode: RenderMode, tz: Tz, clock: Arc<dyn Clock>) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (outbox, receiver) = mpsc::channel(buffer_size);
        (Self { outbox, mode, tz, clock }, receiver)
    }

    async fn deliver(&self, message: OutboundMessage) -> Result<(), NotifyError> {
        debug!(chat_id = message.chat_id, options = message.options.len(), "Queueing outbound message");
        self.outbox.send(message).await.map_err(|_| NotifyError::Closed)
    }
}

#[async_trait]
impl NotificationSink for OutboxSink {
    #[instrument(fields(order_id = summary.order.id, kind = ?summary.kind), skip(self, summary))]
    async fn send_summary(&self, chat_id: ChatId, summary: &Summary) -> Result<(), NotifyError> {
        let text = self.mode.summary(summary, self.tz, self.clock.now());
        self.deliver(OutboundMessage {
            chat_id,
            text,
            markup: Some(self.mode),
            options: Vec::new(),
        })
        .await
    }

    #[instrument(skip(self))]
    async fn send_error(&self, chat_id: ChatId, reason: &str) -> Result<(), NotifyError> {
        self.deliver(OutboundMessage::plain(chat_id, reason)).await
    }

    #[instrument(skip(self, options))]
    async fn send_selectable(&self, chat_id: ChatId, prompt: &str, options: Vec<SelectOption>) -> Result<(), NotifyError> {
        self.deliver(OutboundMessage {
            options,
            ..OutboundMessage::plain(chat_id, prompt)
        })
        .await
    }

    #[instrument(skip(self, text))]
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        self.deliver(OutboundMessage::plain(chat_id, text)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test]
    async fn test_selectable_keeps_options() {
        let (sink, mut outbox) = OutboxSink::new(4, RenderMode::Html, chrono_tz::Asia::Singapore, Arc::new(SystemClock));

        sink.send_selectable(5, "Pick one", vec![SelectOption::new("2 x tea", "/delete 3")])
            .await
            .unwrap();

        let message = outbox.recv().await.unwrap();
        assert_eq!(message.chat_id, 5);
        assert_eq!(message.text, "Pick one");
        assert_eq!(message.markup, None);
        assert_eq!(message.options, vec![SelectOption::new("2 x tea", "/delete 3")]);
    }

    #[tokio::test]
    async fn test_closed_outbox_is_an_error() {
        let (sink, outbox) = OutboxSink::new(4, RenderMode::Html, chrono_tz::Asia::Singapore, Arc::new(SystemClock));
        drop(outbox);

        assert_eq!(sink.send_text(5, "hello").await, Err(NotifyError::Closed));
    }
}
