use crate::error::AppError;
use crate::models::OrderAccepted;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use types::order::OrderSubmission;

/// `POST /api/order`
///
/// Answers as soon as the gate has made its decision: 202 once the order is
/// queued, 400 for a malformed or invalid body, 503 when the queue is full.
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderAccepted>), AppError> {
    state.rate_limiter.check_rate_limit()?;

    let Json(submission) = payload?;

    let symbol = submission.symbol.clone();
    let submission_id = state.gate.submit(submission).map_err(|e| {
        tracing::debug!(%symbol, error = %e, "order submission refused");
        AppError::from(e)
    })?;

    tracing::info!(%submission_id, %symbol, "order accepted");
    Ok((StatusCode::ACCEPTED, Json(OrderAccepted::new(submission_id))))
}
