//! Pipeline tuning knobs

use std::time::Duration;

use thiserror::Error;

use crate::adapters::CacheKeyPolicy;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("intake queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("cache TTL must be non-zero")]
    ZeroCacheTtl,

    #[error("insert retry policy needs at least one attempt")]
    NoInsertAttempts,

    #[error("ledger prune interval must be non-zero")]
    ZeroPruneInterval,
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Cap for the doubled delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Concurrent workers draining the intake queue
    pub workers: usize,
    /// Orders that may wait for a free worker. A submission is refused only
    /// once this many are already waiting, so up to `workers + queue_capacity`
    /// orders can be in hand at once.
    pub queue_capacity: usize,
    /// Expiry of cached order snapshots
    pub cache_ttl: Duration,
    pub cache_key: CacheKeyPolicy,
    pub insert_retry: RetryPolicy,
    /// How long completed and failed orders stay visible in the ledger
    pub ledger_retention: Duration,
    /// How often terminal ledger entries older than the retention are dropped
    pub ledger_prune_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            queue_capacity: 10,
            cache_ttl: Duration::from_secs(600),
            cache_key: CacheKeyPolicy::ByOrder,
            insert_retry: RetryPolicy::default(),
            ledger_retention: Duration::from_secs(600),
            ledger_prune_interval: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroCacheTtl);
        }
        if self.insert_retry.max_attempts == 0 {
            return Err(ConfigError::NoInsertAttempts);
        }
        if self.ledger_prune_interval.is_zero() {
            return Err(ConfigError::ZeroPruneInterval);
        }
        Ok(())
    }
}
