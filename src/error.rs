use thiserror::Error;

use crate::domain::Order;

/// Errors surfaced by order commands to the command layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// User-correctable; never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The chat already has an active order.
    #[error("An active order already exists: {title}")]
    Conflict { title: String },
    /// No active order, no matching item, or not the owner.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Store or scheduler unreachable or timed out.
    #[error("Transient failure: {0}")]
    Transient(String),
}

/// Errors that can occur inside the order store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Chat {} already has active order {}", .0.chat_id, .0.id)]
    ActiveOrderExists(Order),
    #[error("Store record not found: {0}")]
    NotFound(String),
    #[error("Quantity out of range: {0}")]
    QuantityOverflow(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from enqueueing or cancelling delayed jobs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchedulerError {
    #[error("Job payload could not be encoded: {0}")]
    Encode(String),
    #[error("Scheduler unavailable: {0}")]
    Unavailable(String),
}

/// Errors from running a job once it is due.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JobError {
    /// Not retried: the payload will never decode.
    #[error("Job payload could not be decoded: {0}")]
    Decode(String),
    #[error("Job handler failed: {0}")]
    Handler(String),
}

/// Errors from handing a message to the chat transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NotifyError {
    #[error("Outbound channel closed")]
    Closed,
}

/// Startup configuration errors. The only fatal class.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ActiveOrderExists(existing) => OrderError::Conflict {
                title: existing.title,
            },
            StoreError::NotFound(what) => OrderError::NotFound(what),
            StoreError::QuantityOverflow(what) => OrderError::InvalidInput(format!("quantity is too large for {}", what)),
            StoreError::Unavailable(msg) => OrderError::Transient(msg),
        }
    }
}

impl From<SchedulerError> for OrderError {
    fn from(err: SchedulerError) -> Self {
        OrderError::Transient(err.to_string())
    }
}

impl From<NotifyError> for JobError {
    fn from(err: NotifyError) -> Self {
        JobError::Handler(err.to_string())
    }
}

impl From<OrderError> for JobError {
    fn from(err: OrderError) -> Self {
        JobError::Handler(err.to_string())
    }
}
