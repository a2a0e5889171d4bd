//! Order intake pipeline
//!
//! Accepts validated orders at an intake gate, queues them on a bounded
//! channel and processes them with a fixed pool of workers that persist each
//! order, append it to an in-memory per-symbol book and fan out a cache write
//! and a status update.
//!
//! # Architecture
//!
//! ```text
//!  submit()
//!     │
//! ┌───▼────────┐   full → Overloaded
//! │ IntakeGate │──────────────────────►
//! └───┬────────┘
//!     │ try_send
//! ┌───▼────────┐
//! │ mpsc queue │ (bounded)
//! └───┬────────┘
//!     │ N workers
//! ┌───▼────────┐      ┌──────────────┐
//! │ WorkerPool │─────►│ OrderStore   │ insert / update_status
//! └───┬────┬───┘      └──────────────┘
//!     │    │          ┌──────────────┐
//!     │    └─────────►│ OrderCache   │ put(key, json, ttl)
//!     │               └──────────────┘
//! ┌───▼───────┐  ┌──────────────┐
//! │ OrderBook │  │ StatusLedger │
//! └───────────┘  └──────────────┘
//! ```

pub mod adapters;
pub mod book;
pub mod config;
pub mod intake;
pub mod ledger;
pub mod pipeline;
pub mod stats;
pub mod worker;

pub use adapters::{CacheError, CacheKeyPolicy, OrderCache, OrderStore, StoreError};
pub use book::OrderBook;
pub use config::{ConfigError, PipelineConfig, RetryPolicy};
pub use intake::{IntakeError, IntakeGate, IntakeQueue, QueuedOrder};
pub use ledger::{LedgerCounts, LedgerEntry, StatusLedger};
pub use pipeline::Pipeline;
pub use stats::{PipelineStats, StatsSnapshot};
pub use worker::{PipelineDeps, WorkerPool, WorkerSettings};
