//! Contracts for the pipeline's external collaborators
//!
//! The worker pool only talks to the durable store and the ephemeral cache
//! through these traits. Handles are injected at construction and their
//! lifecycle (connect/close) belongs to the process entry point.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::ids::OrderId;
use types::order::{Order, OrderStatus, PersistedOrder};

pub use memory::{MemoryOrderCache, MemoryOrderStore};

/// Durable store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("store query failed: {0}")]
    Query(String),
}

/// Cache failure. Never fatal to the pipeline.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cache write failed: {0}")]
    Write(String),
}

/// Durable order store
///
/// Must be safe to call concurrently from many workers with different orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order row and return its identifier.
    async fn insert(&self, order: &Order) -> Result<OrderId, StoreError>;

    /// Overwrite the status column of an existing row.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), StoreError>;
}

/// Best-effort, time-limited snapshot cache
#[async_trait]
pub trait OrderCache: Send + Sync {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// How cache keys are derived from an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyPolicy {
    /// `order:{order_id}`; one entry per order
    #[default]
    ByOrder,
    /// `order:{user_id}`; a user's later order replaces the earlier one
    ByUser,
}

impl CacheKeyPolicy {
    pub fn key_for(&self, order: &PersistedOrder) -> String {
        match self {
            CacheKeyPolicy::ByOrder => format!("order:{}", order.order_id),
            CacheKeyPolicy::ByUser => format!("order:{}", order.order.user_id),
        }
    }
}

impl std::str::FromStr for CacheKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" | "by_order" => Ok(CacheKeyPolicy::ByOrder),
            "user" | "by_user" => Ok(CacheKeyPolicy::ByUser),
            other => Err(format!("unknown cache key policy {other:?} (expected \"order\" or \"user\")")),
        }
    }
}

/// JSON snapshot stored in the cache
pub fn snapshot_json(order: &PersistedOrder) -> Result<String, CacheError> {
    Ok(serde_json::to_string(order)?)
}
