use crate::handlers::{health, order};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Application routes without transport layers; `main` adds tracing and CORS.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new().route("/order", post(order::create_order));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .with_state(state)
}
