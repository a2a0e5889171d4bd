//! Fixed-size worker pool draining the intake queue
//!
//! Each worker takes one order at a time and runs it through:
//!
//! ```text
//! insert (durable) ──► book append ──► ledger: persisted
//!                                        │
//!                          ┌─────────────┴─────────────┐
//!                     cache snapshot             status update
//!                     (best effort)          ledger: completed | failed
//! ```
//!
//! The insert finishes before the book is touched, so no symbol lock is ever
//! held across a store round-trip. The two follow-ups run as independent
//! tasks on the worker's `JoinSet` while the worker moves on; they meet only
//! through the ledger's compare-and-set transitions.
//!
//! Shutdown is cooperative: the queue stops accepting right away, workers
//! stop taking orders after their current one, wait for their outstanding
//! follow-ups, and exit. Orders still queued at that point are marked failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use types::ids::{OrderId, SubmissionId};
use types::order::{Order, OrderStatus, PersistedOrder};

use crate::adapters::{snapshot_json, CacheKeyPolicy, OrderCache, OrderStore, StoreError};
use crate::book::OrderBook;
use crate::config::{PipelineConfig, RetryPolicy};
use crate::intake::{IntakeQueue, QueuedOrder};
use crate::ledger::StatusLedger;
use crate::stats::PipelineStats;

/// Shared handles every worker needs
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn OrderStore>,
    pub cache: Arc<dyn OrderCache>,
    pub book: Arc<OrderBook>,
    pub ledger: Arc<StatusLedger>,
    pub stats: Arc<PipelineStats>,
}

/// Per-order processing parameters
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub cache_ttl: Duration,
    pub cache_key: CacheKeyPolicy,
    pub insert_retry: RetryPolicy,
}

impl From<&PipelineConfig> for WorkerSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl,
            cache_key: config.cache_key,
            insert_retry: config.insert_retry.clone(),
        }
    }
}

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    queue: IntakeQueue,
    ledger: Arc<StatusLedger>,
    stats: Arc<PipelineStats>,
}

impl WorkerPool {
    /// Start `size` workers on the current tokio runtime.
    pub fn spawn(size: usize, settings: WorkerSettings, queue: IntakeQueue, deps: PipelineDeps) -> Self {
        let (shutdown, _) = watch::channel(false);

        let workers = (0..size)
            .map(|id| {
                let worker = Worker {
                    id,
                    deps: deps.clone(),
                    settings: settings.clone(),
                };
                tokio::spawn(worker.run(queue.clone(), shutdown.subscribe()))
            })
            .collect();

        info!(workers = size, "worker pool started");

        Self {
            workers,
            shutdown,
            queue,
            ledger: deps.ledger,
            stats: deps.stats,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Refuse new orders, let in-flight work finish, then fail what is left.
    pub async fn shutdown(self) {
        info!(workers = self.workers.len(), "worker pool shutting down");
        self.shutdown.send_replace(true);
        // Idle workers release the receiver as soon as they see the signal.
        self.queue.close().await;

        for handle in self.workers {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task ended abnormally");
            }
        }

        let abandoned = self.queue.close_and_drain().await;
        for queued in &abandoned {
            if self
                .ledger
                .transition(queued.submission_id, Some(OrderStatus::Pending), OrderStatus::Failed)
            {
                self.stats.record_failed();
            }
        }
        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "orders still queued at shutdown marked failed");
        }

        info!("worker pool stopped");
    }
}

struct Worker {
    id: usize,
    deps: PipelineDeps,
    settings: WorkerSettings,
}

impl Worker {
    async fn run(self, queue: IntakeQueue, mut shutdown: watch::Receiver<bool>) {
        let mut follow_ups = JoinSet::new();
        debug!(worker = self.id, "worker started");

        loop {
            while let Some(done) = follow_ups.try_join_next() {
                log_follow_up_result(self.id, done);
            }

            if *shutdown.borrow() {
                break;
            }

            let queued = tokio::select! {
                _ = shutdown.changed() => break,
                next = queue.next() => match next {
                    Some(queued) => queued,
                    None => break,
                },
            };

            self.process(queued, &mut follow_ups).await;
        }

        while let Some(done) = follow_ups.join_next().await {
            log_follow_up_result(self.id, done);
        }
        debug!(worker = self.id, "worker stopped");
    }

    async fn process(&self, queued: QueuedOrder, follow_ups: &mut JoinSet<()>) {
        let QueuedOrder {
            submission_id,
            mut order,
            enqueued_at,
        } = queued;

        let order_id = match self.insert_with_retry(&order).await {
            Ok(order_id) => order_id,
            Err(e) => {
                error!(
                    worker = self.id,
                    %submission_id,
                    symbol = %order.symbol,
                    error = %e,
                    "failed to persist order, abandoning"
                );
                if self
                    .deps
                    .ledger
                    .transition(submission_id, Some(OrderStatus::Pending), OrderStatus::Failed)
                {
                    self.deps.stats.record_failed();
                }
                return;
            }
        };

        order.status = OrderStatus::Persisted;
        let persisted = PersistedOrder { order_id, order };

        self.deps.ledger.bind_order_id(submission_id, order_id);
        self.deps.book.append(persisted.clone());
        if self
            .deps
            .ledger
            .transition(submission_id, Some(OrderStatus::Pending), OrderStatus::Persisted)
        {
            self.deps.stats.record_persisted();
        }

        info!(
            worker = self.id,
            %order_id,
            %submission_id,
            symbol = %persisted.order.symbol,
            queued_ms = enqueued_at.elapsed().as_millis() as u64,
            "order persisted and booked"
        );

        let key = self.settings.cache_key.key_for(&persisted);
        follow_ups.spawn(cache_snapshot(
            Arc::clone(&self.deps.cache),
            Arc::clone(&self.deps.stats),
            key,
            persisted,
            self.settings.cache_ttl,
        ));
        follow_ups.spawn(complete_order(
            Arc::clone(&self.deps.store),
            Arc::clone(&self.deps.ledger),
            Arc::clone(&self.deps.stats),
            submission_id,
            order_id,
        ));
    }

    async fn insert_with_retry(&self, order: &Order) -> Result<OrderId, StoreError> {
        let policy = &self.settings.insert_retry;
        let mut attempt = 1;

        loop {
            match self.deps.store.insert(order).await {
                Ok(order_id) => return Ok(order_id),
                Err(e) if attempt < policy.max_attempts => {
                    let delay = policy.backoff(attempt);
                    warn!(
                        worker = self.id,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "insert failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn cache_snapshot(
    cache: Arc<dyn OrderCache>,
    stats: Arc<PipelineStats>,
    key: String,
    order: PersistedOrder,
    ttl: Duration,
) {
    let result = match snapshot_json(&order) {
        Ok(json) => cache.put(&key, json, ttl).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => debug!(%key, order_id = %order.order_id, "order cached"),
        Err(e) => {
            stats.record_cache_error();
            warn!(%key, order_id = %order.order_id, error = %e, "failed to cache order");
        }
    }
}

async fn complete_order(
    store: Arc<dyn OrderStore>,
    ledger: Arc<StatusLedger>,
    stats: Arc<PipelineStats>,
    submission_id: SubmissionId,
    order_id: OrderId,
) {
    match store.update_status(order_id, OrderStatus::Completed).await {
        Ok(()) => {
            if ledger.transition(submission_id, Some(OrderStatus::Persisted), OrderStatus::Completed) {
                stats.record_completed();
                info!(%order_id, %submission_id, "order completed");
            }
        }
        Err(e) => {
            error!(%order_id, %submission_id, error = %e, "failed to update order status");
            if ledger.transition(submission_id, Some(OrderStatus::Persisted), OrderStatus::Failed) {
                stats.record_failed();
            }
        }
    }
}

fn log_follow_up_result(worker: usize, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(worker, error = %e, "follow-up task ended abnormally");
    }
}
