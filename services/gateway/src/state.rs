use crate::rate_limit::RateLimiter;
use order_pipeline::{IntakeGate, Pipeline, PipelineStats, StatusLedger};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub gate: IntakeGate,
    pub ledger: Arc<StatusLedger>,
    pub stats: Arc<PipelineStats>,
    pub rate_limiter: Arc<RateLimiter>,
    pub workers: usize,
}

impl AppState {
    pub fn new(pipeline: &Pipeline, rate_limiter: RateLimiter) -> Self {
        Self {
            gate: pipeline.gate().clone(),
            ledger: Arc::clone(pipeline.ledger()),
            stats: Arc::clone(pipeline.stats()),
            rate_limiter: Arc::new(rate_limiter),
            workers: pipeline.workers(),
        }
    }
}
