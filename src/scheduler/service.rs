use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::{CancelOutcome, EncodedJob, SchedulerClient};
use crate::actor_framework::Response;
use crate::clock::Clock;
use crate::domain::JobHandle;
use crate::error::SchedulerError;

#[derive(Debug)]
pub enum SchedulerRequest {
    Enqueue {
        job: EncodedJob,
        delay_secs: i64,
        respond_to: Response<JobHandle, SchedulerError>,
    },
    Cancel {
        handle: JobHandle,
        respond_to: Response<CancelOutcome, SchedulerError>,
    },
    PendingCount {
        respond_to: Response<usize, SchedulerError>,
    },
    Shutdown,
}

/// A trigger whose delay has elapsed, handed to the `JobWorker`.
#[derive(Debug, Clone)]
pub struct DueJob {
    pub handle: JobHandle,
    pub job: EncodedJob,
}

struct PendingJob {
    handle: JobHandle,
    job: EncodedJob,
    timer: JoinHandle<()>,
}

/// Owns every pending trigger. Each trigger is a sleeping timer task that
/// reports back by job id; a cancelled trigger is aborted and forgotten, so a
/// late report for it is ignored.
pub struct SchedulerService {
    receiver: mpsc::Receiver<SchedulerRequest>,
    elapsed_tx: mpsc::UnboundedSender<String>,
    elapsed_rx: mpsc::UnboundedReceiver<String>,
    due: mpsc::Sender<DueJob>,
    pending: HashMap<String, PendingJob>,
    by_job: HashMap<EncodedJob, String>,
    clock: Arc<dyn Clock>,
}

impl SchedulerService {
    /// `due` receives every trigger that fires; feed it to a `JobWorker`.
    pub fn new(
        buffer_size: usize,
        call_timeout: Duration,
        clock: Arc<dyn Clock>,
        due: mpsc::Sender<DueJob>,
    ) -> (Self, SchedulerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (elapsed_tx, elapsed_rx) = mpsc::unbounded_channel();
        let service = Self {
            receiver,
            elapsed_tx,
            elapsed_rx,
            due,
            pending: HashMap::new(),
            by_job: HashMap::new(),
            clock,
        };
        (service, SchedulerClient::new(sender, call_timeout))
    }

    #[instrument(name = "scheduler_service", skip(self))]
    pub async fn run(mut self) {
        info!("SchedulerService starting");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(SchedulerRequest::Enqueue { job, delay_secs, respond_to }) => {
                        let _ = respond_to.send(Ok(self.handle_enqueue(job, delay_secs)));
                    }
                    Some(SchedulerRequest::Cancel { handle, respond_to }) => {
                        let _ = respond_to.send(Ok(self.handle_cancel(&handle)));
                    }
                    Some(SchedulerRequest::PendingCount { respond_to }) => {
                        let _ = respond_to.send(Ok(self.pending.len()));
                    }
                    Some(SchedulerRequest::Shutdown) | None => {
                        info!("SchedulerService shutting down");
                        break;
                    }
                },
                Some(job_id) = self.elapsed_rx.recv() => {
                    self.handle_elapsed(job_id).await;
                }
            }
        }

        if !self.pending.is_empty() {
            warn!(pending = self.pending.len(), "Discarding triggers that have not fired");
        }
        for (_, pending) in self.pending.drain() {
            pending.timer.abort();
        }

        info!("SchedulerService stopped");
    }

    #[instrument(fields(kind = %job.kind), skip(self, job))]
    fn handle_enqueue(&mut self, job: EncodedJob, delay_secs: i64) -> JobHandle {
        if let Some(existing) = self.by_job.get(&job).and_then(|id| self.pending.get(id)) {
            debug!(job_id = %existing.handle.job_id, "Equivalent job already pending");
            return existing.handle.clone();
        }

        let delay_secs = delay_secs.max(0);
        let job_id = Uuid::new_v4().to_string();
        let handle = JobHandle {
            run_at: self.clock.now().timestamp() + delay_secs,
            job_id: job_id.clone(),
        };

        let elapsed_tx = self.elapsed_tx.clone();
        let timer_job_id = job_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs as u64)).await;
            let _ = elapsed_tx.send(timer_job_id);
        });

        info!(job_id = %job_id, run_at = handle.run_at, "Job scheduled");
        self.by_job.insert(job.clone(), job_id.clone());
        self.pending.insert(
            job_id,
            PendingJob {
                handle: handle.clone(),
                job,
                timer,
            },
        );
        handle
    }

    #[instrument(fields(job_id = %handle.job_id), skip(self, handle))]
    fn handle_cancel(&mut self, handle: &JobHandle) -> CancelOutcome {
        match self.pending.remove(&handle.job_id) {
            Some(pending) => {
                pending.timer.abort();
                self.by_job.remove(&pending.job);
                info!("Job cancelled");
                CancelOutcome::Cancelled
            }
            None => {
                debug!("Job already fired or gone");
                CancelOutcome::AlreadyGone
            }
        }
    }

    async fn handle_elapsed(&mut self, job_id: String) {
        let Some(pending) = self.pending.remove(&job_id) else {
            debug!(job_id = %job_id, "Elapsed job was cancelled");
            return;
        };
        self.by_job.remove(&pending.job);

        debug!(job_id = %job_id, kind = %pending.job.kind, "Job due");
        let due = DueJob {
            handle: pending.handle,
            job: pending.job,
        };
        if self.due.send(due).await.is_err() {
            error!(job_id = %job_id, "Job worker is gone; due job lost");
        }
    }
}
