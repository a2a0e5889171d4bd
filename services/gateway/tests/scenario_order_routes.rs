//! In-process scenario tests for the gateway HTTP endpoints.
//!
//! The router is driven through `tower::ServiceExt::oneshot` against a real
//! pipeline backed by the in-memory store and cache; no socket is bound.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gateway::rate_limit::RateLimiter;
use gateway::router::create_router;
use gateway::state::AppState;
use http_body_util::BodyExt;
use order_pipeline::adapters::{MemoryOrderCache, MemoryOrderStore};
use order_pipeline::{Pipeline, PipelineConfig};
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct TestApp {
    router: axum::Router,
    pipeline: Pipeline,
    store: Arc<MemoryOrderStore>,
}

fn make_app(config: PipelineConfig, rate_limit_per_sec: u32) -> TestApp {
    let store = Arc::new(MemoryOrderStore::recording());
    let cache = Arc::new(MemoryOrderCache::new());
    let pipeline = Pipeline::start(config, store.clone(), cache).expect("valid config");
    let state = AppState::new(&pipeline, RateLimiter::new(rate_limit_per_sec));

    TestApp {
        router: create_router(state),
        pipeline,
        store,
    }
}

fn default_app() -> TestApp {
    make_app(PipelineConfig::default(), 0)
}

fn post_order(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/order")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn order_json(price: Value) -> String {
    json!({
        "user_id": 1,
        "symbol": "BTC",
        "side": "buy",
        "price": price,
        "quantity": 0.1
    })
    .to_string()
}

/// Drive the router with a single request and return (status, json body).
async fn call(router: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    let json = serde_json::from_slice(&body).expect("body is not valid JSON");
    (status, json)
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ---------------------------------------------------------------------------
// POST /api/order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_order_returns_202_with_submission_id() {
    let app = default_app();

    let (status, body) = call(&app.router, post_order(order_json(json!(50000)))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Order received");

    let id = body["submission_id"].as_str().expect("submission_id is a string");
    assert!(uuid::Uuid::parse_str(id).is_ok());

    let ledger = app.pipeline.ledger().clone();
    wait_until("order completed", || ledger.counts().completed == 1).await;
    assert_eq!(app.store.row_count(), 1);

    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn capitalised_field_names_are_accepted() {
    let app = default_app();
    let body = json!({
        "UserID": 7,
        "Symbol": "ETH",
        "Side": "sell",
        "Price": "3100.5",
        "Quantity": "2"
    });

    let (status, _) = call(&app.router, post_order(body.to_string())).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn invalid_order_returns_400_and_is_never_queued() {
    let app = default_app();

    for price in [json!(0), json!(-1)] {
        let (status, body) = call(&app.router, post_order(order_json(price))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BAD_REQUEST");
    }

    let bad_side = json!({"user_id": 1, "symbol": "BTC", "side": "hold", "price": 1, "quantity": 1});
    let (status, _) = call(&app.router, post_order(bad_side.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(app.store.inserted().is_empty());
    assert!(app.pipeline.ledger().is_empty());

    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = default_app();

    let (status, body) = call(&app.router, post_order("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");

    let missing_field = json!({"user_id": 1, "symbol": "BTC", "side": "buy"});
    let (status, _) = call(&app.router, post_order(missing_field.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn full_queue_returns_503() {
    let app = make_app(
        PipelineConfig {
            workers: 1,
            queue_capacity: 1,
            ..PipelineConfig::default()
        },
        0,
    );
    app.store.hold();

    let (status, _) = call(&app.router, post_order(order_json(json!(1)))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let gate = app.pipeline.gate().clone();
    wait_until("worker to take the first order", || gate.queue_depth() == 0).await;

    let (status, _) = call(&app.router, post_order(order_json(json!(1)))).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = call(&app.router, post_order(order_json(json!(1)))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "SERVICE_UNAVAILABLE");

    app.store.release();
    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn rate_limit_returns_429() {
    let app = make_app(PipelineConfig::default(), 2);

    for _ in 0..2 {
        let (status, _) = call(&app.router, post_order(order_json(json!(1)))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, body) = call(&app.router, post_order(order_json(json!(1)))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");

    app.pipeline.shutdown().await;
}

#[tokio::test]
async fn submissions_after_shutdown_return_503() {
    let app = default_app();
    let router = app.router.clone();
    app.pipeline.shutdown().await;

    let (status, _) = call(&router, post_order(order_json(json!(1)))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_queue_and_ledger() {
    let app = make_app(
        PipelineConfig {
            workers: 3,
            queue_capacity: 16,
            ..PipelineConfig::default()
        },
        0,
    );

    let (status, _) = call(&app.router, post_order(order_json(json!(10)))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let ledger = app.pipeline.ledger().clone();
    wait_until("order completed", || ledger.counts().completed == 1).await;

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = call(&app.router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["queue_capacity"], 16);
    assert_eq!(body["workers"], 3);
    assert_eq!(body["ledger"]["completed"], 1);
    assert_eq!(body["stats"]["accepted"], 1);

    app.pipeline.shutdown().await;
}
