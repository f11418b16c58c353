use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use super::{CancelOutcome, Job, Scheduler, SchedulerRequest};
use crate::actor_framework::{request, Response};
use crate::domain::JobHandle;
use crate::error::SchedulerError;

/// Client for [`super::SchedulerService`]. Payloads are encoded here, before
/// they reach the actor.
#[derive(Clone)]
pub struct SchedulerClient {
    sender: mpsc::Sender<SchedulerRequest>,
    call_timeout: Duration,
}

impl SchedulerClient {
    pub fn new(sender: mpsc::Sender<SchedulerRequest>, call_timeout: Duration) -> Self {
        Self { sender, call_timeout }
    }

    async fn call<T>(&self, build: impl FnOnce(Response<T, SchedulerError>) -> SchedulerRequest) -> Result<T, SchedulerError> {
        debug!("Sending request");
        request(&self.sender, self.call_timeout, build, |reason| {
            SchedulerError::Unavailable(format!("scheduler {}", reason))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        debug!("Sending shutdown request");
        self.sender
            .send(SchedulerRequest::Shutdown)
            .await
            .map_err(|_| SchedulerError::Unavailable("scheduler actor closed".to_string()))
    }
}

#[async_trait]
impl Scheduler for SchedulerClient {
    #[instrument(fields(order_id = job.order_id(), kind = %job.kind()), skip(self, job))]
    async fn enqueue_delayed(&self, job: Job, delay_secs: i64) -> Result<JobHandle, SchedulerError> {
        let job = job.encode()?;
        self.call(|respond_to| SchedulerRequest::Enqueue { job, delay_secs, respond_to }).await
    }

    #[instrument(fields(job_id = %handle.job_id), skip(self, handle))]
    async fn cancel_delayed(&self, handle: &JobHandle) -> Result<CancelOutcome, SchedulerError> {
        let handle = handle.clone();
        self.call(|respond_to| SchedulerRequest::Cancel { handle, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn pending_count(&self) -> Result<usize, SchedulerError> {
        self.call(|respond_to| SchedulerRequest::PendingCount { respond_to }).await
    }
}
