//! Shared helpers for the pipeline scenario tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use order_pipeline::adapters::{MemoryOrderCache, MemoryOrderStore};
use order_pipeline::{Pipeline, PipelineConfig};
use rust_decimal::Decimal;
use types::order::OrderSubmission;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn submission(user_id: i64, symbol: &str, side: &str, price: &str, quantity: &str) -> OrderSubmission {
    OrderSubmission {
        user_id,
        symbol: symbol.to_string(),
        side: side.to_string(),
        price: Decimal::from_str(price).unwrap(),
        quantity: Decimal::from_str(quantity).unwrap(),
    }
}

pub fn btc_buy() -> OrderSubmission {
    submission(1, "BTC", "buy", "50000", "0.1")
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub store: Arc<MemoryOrderStore>,
    pub cache: Arc<MemoryOrderCache>,
}

pub fn start(config: PipelineConfig) -> Harness {
    init_tracing();
    let store = Arc::new(MemoryOrderStore::recording());
    let cache = Arc::new(MemoryOrderCache::new());
    let pipeline = Pipeline::start(config, store.clone(), cache.clone()).expect("valid config");
    Harness { pipeline, store, cache }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
