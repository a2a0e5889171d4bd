use crate::models::HealthResponse;
use crate::state::AppState;
use axum::{extract::State, Json};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.gate.is_closed() { "shutting_down" } else { "ok" };

    Json(HealthResponse {
        status,
        queue_depth: state.gate.queue_depth(),
        queue_capacity: state.gate.capacity(),
        workers: state.workers,
        ledger: state.ledger.counts(),
        stats: state.stats.snapshot(),
    })
}
