//! HTTP boundary of the order pipeline
//!
//! `POST /api/order` hands a submission to the intake gate and reports the
//! gate's decision straight away; `GET /health` exposes queue and ledger
//! state. Postgres and Redis adapters live here so the pipeline crate stays
//! free of backend drivers.

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;
pub mod store;
