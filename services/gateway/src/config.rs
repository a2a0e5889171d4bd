//! Command-line and environment configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use order_pipeline::{CacheKeyPolicy, PipelineConfig, RetryPolicy};

#[derive(Debug, Clone, Parser)]
#[command(name = "gateway", about = "HTTP intake for the order pipeline")]
pub struct GatewayConfig {
    /// Interface to listen on
    #[arg(long, env = "BIND_ADDR", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Concurrent pipeline workers
    #[arg(long, env = "PIPELINE_WORKERS", default_value_t = 10)]
    pub workers: usize,

    /// Orders that may wait while every worker is busy; the next one gets 503
    #[arg(long, env = "PIPELINE_QUEUE_CAPACITY", default_value_t = 10)]
    pub queue_capacity: usize,

    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 600)]
    pub cache_ttl_secs: u64,

    /// Cache key scheme: "order" (order:{order_id}) or "user" (order:{user_id})
    #[arg(long, env = "CACHE_KEY", default_value = "order")]
    pub cache_key: CacheKeyPolicy,

    /// Insert attempts per order, including the first
    #[arg(long, env = "INSERT_MAX_ATTEMPTS", default_value_t = 1)]
    pub insert_max_attempts: u32,

    /// Seconds a completed or failed order stays in the status ledger
    #[arg(long, env = "LEDGER_RETENTION_SECS", default_value_t = 600)]
    pub ledger_retention_secs: u64,

    #[arg(long, env = "LEDGER_PRUNE_INTERVAL_SECS", default_value_t = 60)]
    pub ledger_prune_interval_secs: u64,

    /// Postgres connection string; in-memory store when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// Redis connection string; in-memory cache when unset
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Global submissions per second; 0 disables the limit
    #[arg(long, env = "RATE_LIMIT_PER_SEC", default_value_t = 200)]
    pub rate_limit_per_sec: u32,

    /// Apply embedded migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS")]
    pub run_migrations: bool,
}

impl GatewayConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_key: self.cache_key,
            insert_retry: RetryPolicy {
                max_attempts: self.insert_max_attempts,
                ..RetryPolicy::default()
            },
            ledger_retention: Duration::from_secs(self.ledger_retention_secs),
            ledger_prune_interval: Duration::from_secs(self.ledger_prune_interval_secs),
        }
    }
}
