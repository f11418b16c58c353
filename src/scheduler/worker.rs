use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::{DueJob, Job};
use crate::domain::{JobHandle, OrderId};
use crate::error::JobError;

/// Executes decoded jobs.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: Job) -> Result<(), JobError>;
}

/// How often a failing job is attempted before it is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// One async lock per order with a job in flight. Entries are pruned once
/// no job holds or waits on them.
#[derive(Clone, Default)]
pub struct OrderLanes {
    lanes: Arc<Mutex<HashMap<OrderId, Arc<AsyncMutex<()>>>>>,
}

impl OrderLanes {
    pub fn lane(&self, order_id: OrderId) -> Arc<AsyncMutex<()>> {
        self.lanes.lock().entry(order_id).or_default().clone()
    }

    /// Drop the lane for `order_id` if only the map still references it.
    pub fn prune(&self, order_id: OrderId) {
        let mut lanes = self.lanes.lock();
        if lanes.get(&order_id).is_some_and(|lane| Arc::strong_count(lane) == 1) {
            lanes.remove(&order_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lanes.lock().len()
    }
}

/// Consumes due jobs: decodes each once, then runs it on its order's lane
/// with bounded retry. Jobs of different orders run in parallel.
pub struct JobWorker {
    receiver: mpsc::Receiver<DueJob>,
    handler: Arc<dyn JobHandler>,
    policy: RetryPolicy,
    lanes: OrderLanes,
    in_flight: JoinSet<()>,
}

impl JobWorker {
    pub fn new(receiver: mpsc::Receiver<DueJob>, handler: Arc<dyn JobHandler>, policy: RetryPolicy) -> Self {
        Self {
            receiver,
            handler,
            policy,
            lanes: OrderLanes::default(),
            in_flight: JoinSet::new(),
        }
    }

    /// Runs until the due channel closes, then waits for in-flight jobs.
    #[instrument(name = "job_worker", skip(self))]
    pub async fn run(mut self) {
        info!(max_attempts = self.policy.max_attempts, "JobWorker starting");

        loop {
            tokio::select! {
                due = self.receiver.recv() => match due {
                    Some(due) => self.dispatch(due),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Job task panicked");
                    }
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Job task panicked");
            }
        }
        info!("JobWorker stopped");
    }

    fn dispatch(&mut self, due: DueJob) {
        let job = match Job::decode(&due.job) {
            Ok(job) => job,
            Err(e) => {
                error!(job_id = %due.handle.job_id, error = %e, "Dropping job with undecodable payload");
                return;
            }
        };

        let span = info_span!("job", job_id = %due.handle.job_id, kind = %job.kind(), order_id = job.order_id());
        let task = execute(self.handler.clone(), self.lanes.clone(), self.policy, job, due.handle);
        self.in_flight.spawn(task.instrument(span));
    }
}

async fn execute(handler: Arc<dyn JobHandler>, lanes: OrderLanes, policy: RetryPolicy, job: Job, handle: JobHandle) {
    let order_id = job.order_id();
    let lane = lanes.lane(order_id);
    let guard = lane.clone().lock_owned().await;

    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match handler.handle(job).await {
            Ok(()) => {
                debug!(attempt, "Job completed");
                break;
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, error = %e, "Job attempt failed, retrying");
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => {
                error!(
                    attempts = attempt,
                    job_id = %handle.job_id,
                    run_at = handle.run_at,
                    error = %e,
                    "Job dropped after exhausting retries"
                );
            }
        }
    }

    drop(guard);
    drop(lane);
    lanes.prune(order_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Fails the first `failures` calls, tracks peak concurrency per run.
    struct FlakyHandler {
        failures: u32,
        calls: AtomicU32,
        running: AtomicUsize,
        peak: AtomicUsize,
        hold: Duration,
    }

    impl FlakyHandler {
        fn new(failures: u32, hold: Duration) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                hold,
            })
        }
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        async fn handle(&self, _job: Job) -> Result<(), JobError> {
            let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now_running, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(JobError::Handler(format!("failure {}", call)))
            } else {
                Ok(())
            }
        }
    }

    fn due(job: Job, id: &str) -> DueJob {
        DueJob {
            handle: JobHandle { run_at: 0, job_id: id.to_string() },
            job: job.encode().unwrap(),
        }
    }

    async fn run_worker(handler: Arc<FlakyHandler>, jobs: Vec<DueJob>) {
        let (tx, rx) = mpsc::channel(16);
        let policy = RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(100) };
        let worker = tokio::spawn(JobWorker::new(rx, handler, policy).run());
        for job in jobs {
            tx.send(job).await.unwrap();
        }
        drop(tx);
        worker.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let handler = FlakyHandler::new(2, Duration::ZERO);
        run_worker(handler.clone(), vec![due(Job::finalize(1), "a")]).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drops_after_three_attempts() {
        let handler = FlakyHandler::new(10, Duration::ZERO);
        run_worker(handler.clone(), vec![due(Job::finalize(1), "a")]).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_of_one_order_never_overlap() {
        let handler = FlakyHandler::new(0, Duration::from_secs(1));
        run_worker(
            handler.clone(),
            vec![due(Job::reminder(4), "r"), due(Job::finalize(4), "f")],
        )
        .await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(handler.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_of_different_orders_run_in_parallel() {
        let handler = FlakyHandler::new(0, Duration::from_secs(1));
        run_worker(
            handler.clone(),
            vec![due(Job::finalize(1), "a"), due(Job::finalize(2), "b")],
        )
        .await;
        assert_eq!(handler.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dropped() {
        let handler = FlakyHandler::new(0, Duration::ZERO);
        let broken = DueJob {
            handle: JobHandle { run_at: 0, job_id: "bad".into() },
            job: super::super::EncodedJob {
                kind: super::super::JobKind::Finalize,
                payload: "not json".into(),
            },
        };
        run_worker(handler.clone(), vec![broken]).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lanes_are_pruned() {
        let lanes = OrderLanes::default();
        let lane = lanes.lane(1);
        lanes.prune(1);
        assert_eq!(lanes.len(), 1);
        drop(lane);
        lanes.prune(1);
        assert_eq!(lanes.len(), 0);
    }
}
