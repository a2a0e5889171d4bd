use serde::Serialize;
use order_pipeline::{LedgerCounts, StatsSnapshot};
use types::ids::SubmissionId;
use types::order::OrderStatus;

/// Body of a 202 response to an order submission
#[derive(Debug, Clone, Serialize)]
pub struct OrderAccepted {
    pub submission_id: SubmissionId,
    pub status: OrderStatus,
    pub message: &'static str,
}

impl OrderAccepted {
    pub fn new(submission_id: SubmissionId) -> Self {
        Self {
            submission_id,
            status: OrderStatus::Pending,
            message: "Order received",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub workers: usize,
    pub ledger: LedgerCounts,
    pub stats: StatsSnapshot,
}
