//! Wiring of gate, queue, pool, book and ledger

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::adapters::{OrderCache, OrderStore};
use crate::book::OrderBook;
use crate::config::{ConfigError, PipelineConfig};
use crate::intake::{self, IntakeGate};
use crate::ledger::StatusLedger;
use crate::stats::PipelineStats;
use crate::worker::{PipelineDeps, WorkerPool, WorkerSettings};

/// A running order pipeline
///
/// Store and cache handles are injected; the caller keeps ownership of their
/// lifecycle and closes them after [`shutdown`](Pipeline::shutdown) returns.
pub struct Pipeline {
    gate: IntakeGate,
    pool: WorkerPool,
    pruner: JoinHandle<()>,
    book: Arc<OrderBook>,
    ledger: Arc<StatusLedger>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Validate `config` and start the worker pool on the current runtime.
    pub fn start(
        config: PipelineConfig,
        store: Arc<dyn OrderStore>,
        cache: Arc<dyn OrderCache>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let book = Arc::new(OrderBook::new());
        let ledger = Arc::new(StatusLedger::new());
        let stats = Arc::new(PipelineStats::new());

        let (gate, queue) = intake::channel(config.queue_capacity, Arc::clone(&ledger), Arc::clone(&stats));

        let deps = PipelineDeps {
            store,
            cache,
            book: Arc::clone(&book),
            ledger: Arc::clone(&ledger),
            stats: Arc::clone(&stats),
        };
        let pool = WorkerPool::spawn(config.workers, WorkerSettings::from(&config), queue, deps);
        let pruner = spawn_ledger_pruner(
            Arc::clone(&ledger),
            config.ledger_retention,
            config.ledger_prune_interval,
        );

        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "order pipeline started"
        );

        Ok(Self {
            gate,
            pool,
            pruner,
            book,
            ledger,
            stats,
        })
    }

    /// Submission entry point; cheap to clone into request handlers.
    pub fn gate(&self) -> &IntakeGate {
        &self.gate
    }

    pub fn book(&self) -> &Arc<OrderBook> {
        &self.book
    }

    pub fn ledger(&self) -> &Arc<StatusLedger> {
        &self.ledger
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn workers(&self) -> usize {
        self.pool.size()
    }

    pub async fn shutdown(self) {
        self.pool.shutdown().await;
        self.pruner.abort();
    }
}

/// Periodically drop terminal ledger entries older than `retention`.
fn spawn_ledger_pruner(ledger: Arc<StatusLedger>, retention: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = ledger.prune_terminal(retention);
            if removed > 0 {
                debug!(removed, remaining = ledger.len(), "pruned terminal ledger entries");
            }
        }
    })
}
