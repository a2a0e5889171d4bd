//! Admission control under load
//!
//! The gate must answer immediately: accept while the queue has room, refuse
//! with `Overloaded` once it is full, and never let invalid input through.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{btc_buy, start, submission, wait_until};
use order_pipeline::{intake, IntakeError, PipelineConfig, PipelineStats, StatusLedger};
use types::errors::ValidationError;
use types::order::OrderStatus;

#[tokio::test]
async fn test_overload_with_no_workers_running() {
    let ledger = Arc::new(StatusLedger::new());
    let stats = Arc::new(PipelineStats::new());
    let (gate, _queue) = intake::channel(1, Arc::clone(&ledger), Arc::clone(&stats));

    let first = gate.submit(btc_buy());
    assert!(first.is_ok());

    let second = gate.submit(btc_buy());
    assert_eq!(second.unwrap_err(), IntakeError::Overloaded);

    assert_eq!(gate.queue_depth(), 1);
    assert_eq!(ledger.len(), 1);
    assert_eq!(stats.snapshot().accepted, 1);
    assert_eq!(stats.snapshot().rejected_overloaded, 1);
}

#[tokio::test]
async fn test_overload_when_queue_full_and_workers_busy() {
    let h = start(PipelineConfig {
        workers: 1,
        queue_capacity: 1,
        ..PipelineConfig::default()
    });
    h.store.hold();
    let gate = h.pipeline.gate().clone();

    gate.submit(btc_buy()).unwrap();
    wait_until("worker to pick up the first order", || gate.queue_depth() == 0).await;
    gate.submit(btc_buy()).unwrap();

    let started = Instant::now();
    let rejected = gate.submit(btc_buy());
    assert!(started.elapsed() < Duration::from_secs(1), "submit must not block");
    assert_eq!(rejected.unwrap_err(), IntakeError::Overloaded);

    h.store.release();
    let ledger = h.pipeline.ledger().clone();
    wait_until("accepted orders completed", || ledger.counts().completed == 2).await;
    assert_eq!(ledger.len(), 2);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn test_burst_is_split_into_accepted_and_overloaded() {
    let h = start(PipelineConfig {
        workers: 2,
        queue_capacity: 5,
        ..PipelineConfig::default()
    });
    h.store.hold();
    let gate = h.pipeline.gate().clone();

    let mut accepted = 0;
    let mut overloaded = 0;
    for i in 0..200 {
        match gate.submit(submission(i, "BTC", "buy", "1", "1")) {
            Ok(_) => accepted += 1,
            Err(IntakeError::Overloaded) => overloaded += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }

    assert_eq!(accepted + overloaded, 200);
    // Queue slots plus at most one order in each worker's hands.
    assert!(accepted <= 5 + 2, "accepted {accepted}");
    assert!(accepted >= 5);

    h.store.release();
    let ledger = h.pipeline.ledger().clone();
    wait_until("accepted orders completed", || ledger.counts().completed == accepted).await;
    assert_eq!(h.store.row_count(), accepted);

    h.pipeline.shutdown().await;
}

#[tokio::test]
async fn test_invalid_submissions_never_reach_the_queue() {
    let h = start(PipelineConfig::default());
    let gate = h.pipeline.gate().clone();

    let cases = [
        (submission(1, "BTC", "buy", "0", "1"), "zero price"),
        (submission(1, "BTC", "buy", "-5", "1"), "negative price"),
        (submission(1, "BTC", "buy", "100", "0"), "zero quantity"),
        (submission(1, "BTC", "buy", "100", "-0.1"), "negative quantity"),
        (submission(1, "", "buy", "100", "1"), "empty symbol"),
        (submission(1, "BTC", "hold", "100", "1"), "unknown side"),
        (submission(1, "BTC", "BUY", "100", "1"), "uppercase side"),
    ];

    for (case, name) in cases {
        let err = gate.submit(case).unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)), "{name}: {err:?}");
    }

    assert_eq!(
        gate.submit(submission(1, "", "buy", "1", "1")).unwrap_err(),
        IntakeError::Validation(ValidationError::EmptySymbol)
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.store.inserted().is_empty());
    assert!(h.pipeline.ledger().is_empty());
    assert_eq!(h.pipeline.stats().snapshot().rejected_invalid, 8);
    assert_eq!(h.pipeline.stats().snapshot().accepted, 0);

    // A valid order still goes straight through afterwards.
    let id = gate.submit(btc_buy()).unwrap();
    let ledger = h.pipeline.ledger().clone();
    wait_until("completion", || ledger.status(id) == Some(OrderStatus::Completed)).await;

    h.pipeline.shutdown().await;
}
