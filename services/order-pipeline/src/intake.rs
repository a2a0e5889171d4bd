//! Intake gate and the shared intake queue
//!
//! The gate is the only producer-side entry into the pipeline. It validates a
//! submission, opens its ledger entry and makes exactly one non-blocking
//! enqueue attempt. A full queue is reported as [`IntakeError::Overloaded`]
//! straight away; callers at the network boundary are never made to wait.
//!
//! The queue is a bounded tokio channel. Workers share the receiving half
//! behind an async mutex, so an idle worker parks on the queue without
//! blocking the others' processing.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use types::errors::ValidationError;
use types::ids::SubmissionId;
use types::order::{Order, OrderSubmission};

use crate::ledger::StatusLedger;
use crate::stats::PipelineStats;

/// Synchronous rejection at submission time
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntakeError {
    #[error("invalid order: {0}")]
    Validation(#[from] ValidationError),

    #[error("intake queue is full, try again later")]
    Overloaded,

    #[error("order pipeline is shutting down")]
    ShuttingDown,
}

/// An accepted order waiting for a worker
#[derive(Debug)]
pub struct QueuedOrder {
    pub submission_id: SubmissionId,
    pub order: Order,
    pub enqueued_at: Instant,
}

/// Create a gate and the queue it feeds.
///
/// `capacity` is clamped to at least one slot.
pub fn channel(
    capacity: usize,
    ledger: Arc<StatusLedger>,
    stats: Arc<PipelineStats>,
) -> (IntakeGate, IntakeQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let gate = IntakeGate { tx, ledger, stats };
    let queue = IntakeQueue {
        rx: Arc::new(Mutex::new(rx)),
    };
    (gate, queue)
}

#[derive(Clone)]
pub struct IntakeGate {
    tx: mpsc::Sender<QueuedOrder>,
    ledger: Arc<StatusLedger>,
    stats: Arc<PipelineStats>,
}

impl IntakeGate {
    /// Validate and enqueue a submission.
    pub fn submit(&self, submission: OrderSubmission) -> Result<SubmissionId, IntakeError> {
        let order = match submission.validate() {
            Ok(order) => order,
            Err(e) => {
                self.stats.record_rejected_invalid();
                debug!(error = %e, "submission rejected");
                return Err(e.into());
            }
        };

        let submission_id = SubmissionId::new();
        let symbol = order.symbol.clone();

        // Opened before the send so a fast worker always finds the entry.
        self.ledger.open(submission_id);

        let queued = QueuedOrder {
            submission_id,
            order,
            enqueued_at: Instant::now(),
        };

        match self.tx.try_send(queued) {
            Ok(()) => {
                self.stats.record_accepted();
                debug!(%submission_id, %symbol, "order queued");
                Ok(submission_id)
            }
            Err(TrySendError::Full(_)) => {
                self.ledger.discard(submission_id);
                self.stats.record_rejected_overloaded();
                warn!(%symbol, capacity = self.capacity(), "intake queue full, rejecting order");
                Err(IntakeError::Overloaded)
            }
            Err(TrySendError::Closed(_)) => {
                self.ledger.discard(submission_id);
                Err(IntakeError::ShuttingDown)
            }
        }
    }

    /// Orders currently waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the intake queue, shared by all workers
#[derive(Clone)]
pub struct IntakeQueue {
    rx: Arc<Mutex<mpsc::Receiver<QueuedOrder>>>,
}

impl IntakeQueue {
    /// Wait for the next order. `None` once the queue is closed and empty.
    ///
    /// Cancel safe: dropping the future never loses an order.
    pub async fn next(&self) -> Option<QueuedOrder> {
        self.rx.lock().await.recv().await
    }

    /// Refuse further sends. Orders already queued stay receivable.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Refuse further sends and hand back whatever is still queued.
    pub async fn close_and_drain(&self) -> Vec<QueuedOrder> {
        let mut rx = self.rx.lock().await;
        rx.close();

        let mut remaining = Vec::new();
        while let Ok(queued) = rx.try_recv() {
            remaining.push(queued);
        }
        remaining
    }
}
