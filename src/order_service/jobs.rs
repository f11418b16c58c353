use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::OrderService;
use crate::domain::SummaryKind;
use crate::error::{JobError, OrderError};
use crate::notify::NotificationSink;
use crate::scheduler::{FinalizePayload, Job, JobHandler};

/// Runs `finalize` jobs: closes or reminds through [`OrderService`], then
/// posts the summary to the order's chat.
pub struct FinalizeJobHandler {
    orders: Arc<OrderService>,
    sink: Arc<dyn NotificationSink>,
}

impl FinalizeJobHandler {
    pub fn new(orders: Arc<OrderService>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { orders, sink }
    }
}

#[async_trait]
impl JobHandler for FinalizeJobHandler {
    async fn handle(&self, job: Job) -> Result<(), JobError> {
        let Job::Finalize(FinalizePayload { order_id, is_reminder }) = job;

        let summary = match self.orders.finalize_order(order_id, is_reminder).await {
            Ok(summary) => summary,
            Err(OrderError::NotFound(what)) => {
                error!(order_id, what = %what, "Trigger fired for an unknown order; dropping it");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if summary.kind == SummaryKind::Reminder && !summary.order.active {
            debug!(order_id, "Order closed before its reminder fired");
            return Ok(());
        }

        self.sink.send_summary(summary.order.chat_id, &summary).await?;
        Ok(())
    }
}
