use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::AppConfig;
use crate::clock::Clock;
use crate::commands::Dispatcher;
use crate::notify::{NotificationSink, OutboundMessage, OutboxSink};
use crate::order_service::{FinalizeJobHandler, OrderService};
use crate::scheduler::{JobWorker, SchedulerClient, SchedulerService};
use crate::store::{StoreClient, StoreService};

/// The running bot: every actor started and wired together.
///
/// Inbound updates go to `dispatcher`; everything the bot says comes out of
/// the outbox receiver returned by [`OrderBotSystem::new`].
pub struct OrderBotSystem {
    pub dispatcher: Arc<Dispatcher>,
    pub orders: Arc<OrderService>,
    store: StoreClient,
    scheduler: SchedulerClient,
    store_handle: JoinHandle<()>,
    scheduler_handle: JoinHandle<()>,
    worker_handle: JoinHandle<()>,
}

impl OrderBotSystem {
    pub fn new(config: &AppConfig, clock: Arc<dyn Clock>) -> (Self, mpsc::Receiver<OutboundMessage>) {
        // 1. Store
        let (store_service, store) = StoreService::new(config.channel_buffer, config.call_timeout);
        let store_handle = tokio::spawn(store_service.run());

        // 2. Scheduler, emitting due jobs for the worker started below
        let (due_tx, due_rx) = mpsc::channel(config.channel_buffer);
        let (scheduler_service, scheduler) =
            SchedulerService::new(config.channel_buffer, config.call_timeout, clock.clone(), due_tx);
        let scheduler_handle = tokio::spawn(scheduler_service.run());

        // 3. Outbound messages
        let (outbox_sink, outbox) =
            OutboxSink::new(config.channel_buffer, config.render_mode, config.timezone, clock.clone());
        let sink: Arc<dyn NotificationSink> = Arc::new(outbox_sink);

        // 4. Order logic
        let orders = Arc::new(OrderService::new(
            Arc::new(store.clone()),
            Arc::new(scheduler.clone()),
            clock,
            config.timezone,
        ));

        // 5. Job worker closing the loop back into the order logic
        let handler = Arc::new(FinalizeJobHandler::new(orders.clone(), sink.clone()));
        let worker_handle = tokio::spawn(JobWorker::new(due_rx, handler, config.retry).run());

        let dispatcher = Arc::new(Dispatcher::new(orders.clone(), sink));

        let system = Self {
            dispatcher,
            orders,
            store,
            scheduler,
            store_handle,
            scheduler_handle,
            worker_handle,
        };
        (system, outbox)
    }

    /// Stops taking triggers, lets in-flight jobs finish, then stops the store.
    /// Triggers that have not fired yet are discarded.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");

        if let Err(e) = self.scheduler.shutdown().await {
            error!(error = %e, "Scheduler already stopped");
        }
        join("scheduler", self.scheduler_handle).await?;
        // The worker ends once the scheduler's due channel is closed and drained.
        join("job worker", self.worker_handle).await?;

        if let Err(e) = self.store.shutdown().await {
            error!(error = %e, "Store already stopped");
        }
        join("store", self.store_handle).await?;

        info!("System shutdown complete.");
        Ok(())
    }
}

async fn join(name: &str, handle: JoinHandle<()>) -> Result<(), String> {
    handle.await.map_err(|e| {
        error!(actor = name, "Actor task failed: {:?}", e);
        format!("{} task failed: {:?}", name, e)
    })
}
