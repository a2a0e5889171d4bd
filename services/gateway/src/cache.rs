//! Redis-backed [`OrderCache`]

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use order_pipeline::{CacheError, OrderCache};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use tracing::debug;

/// `SET key value EX ttl` over a shared multiplexed connection
#[derive(Clone)]
pub struct RedisOrderCache {
    connection: MultiplexedConnection,
}

impl RedisOrderCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = RedisClient::open(redis_url).context("invalid Redis URL")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        debug!("Connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl OrderCache for RedisOrderCache {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        // Redis rejects EX 0.
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();

        let _: () = conn
            .set_ex(key, value, seconds)
            .await
            .map_err(cache_error)?;
        Ok(())
    }
}

fn cache_error(err: redis::RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::Write(err.to_string())
    }
}
