//! Delayed triggers.
//!
//! ```text
//! SchedulerClient ──enqueue/cancel──▶ SchedulerService (timers, dedup, handles)
//!                                           │ due
//!                                           ▼
//!                                      JobWorker ──per-order lane, bounded retry──▶ JobHandler
//! ```
//!
//! The service is the authority on whether a trigger still exists. Handles
//! stored elsewhere are only cancellation tokens.

mod client;
mod job;
mod service;
mod worker;

pub use client::SchedulerClient;
pub use job::{EncodedJob, FinalizePayload, Job, JobKind};
pub use service::{DueJob, SchedulerRequest, SchedulerService};
pub use worker::{JobHandler, JobWorker, RetryPolicy};

use async_trait::async_trait;

use crate::domain::JobHandle;
use crate::error::SchedulerError;

/// Result of a best-effort cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// Already fired, already cancelled, or never known. Not an error.
    AlreadyGone,
}

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Schedule one future run of `job` after `delay_secs` (zero or negative
    /// fires immediately). Enqueuing a job equal to one still pending returns
    /// the pending handle instead of scheduling a second run.
    async fn enqueue_delayed(&self, job: Job, delay_secs: i64) -> Result<JobHandle, SchedulerError>;

    async fn cancel_delayed(&self, handle: &JobHandle) -> Result<CancelOutcome, SchedulerError>;

    /// Number of triggers not yet fired or cancelled.
    async fn pending_count(&self) -> Result<usize, SchedulerError>;
}
