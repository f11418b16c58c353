//! # Mock Framework
//!
//! Test doubles for the seams of `OrderService`:
//!
//! - [`ManualClock`] pins "now" so deadline arithmetic is deterministic.
//! - [`RecordingScheduler`] records enqueues and cancellations instead of
//!   running timers, and can be told to fail.
//! - [`RecordingSink`] keeps every outbound message for assertions.
//! - [`create_mock_store`] hands out a `StoreClient` whose requests arrive on
//!   a receiver the test controls, for simulating a slow or broken store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::domain::{ChatId, JobHandle, Summary};
use crate::error::{NotifyError, SchedulerError};
use crate::notify::{NotificationSink, SelectOption};
use crate::scheduler::{CancelOutcome, Job, Scheduler};
use crate::store::{StoreClient, StoreRequest, StoreService};

/// A wall-clock instant in Singapore.
pub fn singapore(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    chrono_tz::Asia::Singapore
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("unambiguous local time")
        .with_timezone(&Utc)
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enqueued {
    pub job: Job,
    pub delay_secs: i64,
    pub handle: JobHandle,
}

#[derive(Default)]
struct SchedulerLog {
    enqueued: Vec<Enqueued>,
    cancelled: Vec<JobHandle>,
    fail_enqueue_from: Option<usize>,
}

/// Scheduler that never fires. Handles are `job-<n>` in enqueue order.
#[derive(Default)]
pub struct RecordingScheduler {
    log: Mutex<SchedulerLog>,
}

impl RecordingScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueue number `n` (zero-based) and every later one fail.
    pub fn fail_enqueues_from(&self, n: usize) {
        self.log.lock().fail_enqueue_from = Some(n);
    }

    pub fn enqueued(&self) -> Vec<Enqueued> {
        self.log.lock().enqueued.clone()
    }

    pub fn cancelled(&self) -> Vec<JobHandle> {
        self.log.lock().cancelled.clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn enqueue_delayed(&self, job: Job, delay_secs: i64) -> Result<JobHandle, SchedulerError> {
        let mut log = self.log.lock();
        let n = log.enqueued.len();
        if log.fail_enqueue_from.is_some_and(|from| n >= from) {
            return Err(SchedulerError::Unavailable("scheduler call timed out".to_string()));
        }

        let handle = JobHandle {
            run_at: delay_secs,
            job_id: format!("job-{}", n),
        };
        log.enqueued.push(Enqueued {
            job,
            delay_secs,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    async fn cancel_delayed(&self, handle: &JobHandle) -> Result<CancelOutcome, SchedulerError> {
        let mut log = self.log.lock();
        let issued = log.enqueued.iter().any(|enqueued| enqueued.handle == *handle);
        if !issued || log.cancelled.contains(handle) {
            return Ok(CancelOutcome::AlreadyGone);
        }
        log.cancelled.push(handle.clone());
        Ok(CancelOutcome::Cancelled)
    }

    async fn pending_count(&self) -> Result<usize, SchedulerError> {
        let log = self.log.lock();
        // Only issued handles are ever recorded as cancelled.
        Ok(log.enqueued.len().saturating_sub(log.cancelled.len()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Summary(ChatId, Summary),
    Error(ChatId, String),
    Selectable(ChatId, String, Vec<SelectOption>),
    Text(ChatId, String),
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything sent so far; clears the log.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn summaries(&self) -> Vec<Summary> {
        self.sent
            .lock()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Summary(_, summary) => Some(summary.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_summary(&self, chat_id: ChatId, summary: &Summary) -> Result<(), NotifyError> {
        self.sent.lock().push(Sent::Summary(chat_id, summary.clone()));
        Ok(())
    }

    async fn send_error(&self, chat_id: ChatId, reason: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(Sent::Error(chat_id, reason.to_string()));
        Ok(())
    }

    async fn send_selectable(&self, chat_id: ChatId, prompt: &str, options: Vec<SelectOption>) -> Result<(), NotifyError> {
        self.sent.lock().push(Sent::Selectable(chat_id, prompt.to_string(), options));
        Ok(())
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(Sent::Text(chat_id, text.to_string()));
        Ok(())
    }
}

/// A running in-memory store.
pub fn start_store() -> StoreClient {
    let (service, client) = StoreService::new(16, Duration::from_secs(5));
    tokio::spawn(service.run());
    client
}

/// Creates a store client and the receiver its requests arrive on.
pub fn create_mock_store(buffer_size: usize, call_timeout: Duration) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender, call_timeout), receiver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_scheduler() {
        let scheduler = RecordingScheduler::new();
        let first = scheduler.enqueue_delayed(Job::reminder(1), 900).await.unwrap();
        scheduler.fail_enqueues_from(1);

        assert!(scheduler.enqueue_delayed(Job::finalize(1), 1200).await.is_err());
        assert_eq!(scheduler.cancel_delayed(&first).await, Ok(CancelOutcome::Cancelled));
        assert_eq!(scheduler.cancel_delayed(&first).await, Ok(CancelOutcome::AlreadyGone));
        assert_eq!(scheduler.pending_count().await, Ok(0));
    }

    #[tokio::test]
    async fn test_recording_scheduler_ignores_unknown_handles() {
        let scheduler = RecordingScheduler::new();
        let stranger = JobHandle {
            run_at: 60,
            job_id: "elsewhere".to_string(),
        };

        assert_eq!(scheduler.cancel_delayed(&stranger).await, Ok(CancelOutcome::AlreadyGone));
        assert!(scheduler.cancelled().is_empty());
        assert_eq!(scheduler.pending_count().await, Ok(0));
    }

    #[tokio::test]
    async fn test_mock_store_receives_requests() {
        let (store, mut receiver) = create_mock_store(4, Duration::from_secs(1));
        let lookup = tokio::spawn(async move {
            use crate::store::OrderStore;
            store.get_order_by_id(3).await
        });

        match receiver.recv().await {
            Some(StoreRequest::GetOrderById { id, respond_to }) => {
                assert_eq!(id, 3);
                respond_to.send(Ok(None)).unwrap();
            }
            other => panic!("Unexpected request: {:?}", other),
        }
        assert_eq!(lookup.await.unwrap(), Ok(None));
    }
}
