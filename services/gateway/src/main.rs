//! gateway entry point.
//!
//! Loads configuration, connects the backends, starts the pipeline and
//! serves HTTP until Ctrl-C or SIGTERM. Handlers live in `handlers/`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gateway::cache::RedisOrderCache;
use gateway::config::GatewayConfig;
use gateway::rate_limit::RateLimiter;
use gateway::router::create_router;
use gateway::state::AppState;
use gateway::store::{self, PgOrderStore};
use order_pipeline::adapters::{MemoryOrderCache, MemoryOrderStore};
use order_pipeline::{OrderCache, OrderStore, Pipeline};
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let config = GatewayConfig::parse();
    info!(
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        rate_limit_per_sec = config.rate_limit_per_sec,
        "Starting Gateway API service"
    );

    let (store, db_pool): (Arc<dyn OrderStore>, Option<PgPool>) = match &config.database_url {
        Some(url) => {
            let pool = store::connect(url, config.database_max_connections).await?;
            if config.run_migrations {
                store::migrate(&pool).await?;
                info!("database migrations applied");
            }
            let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(pool.clone()));
            (store, Some(pool))
        }
        None => {
            warn!("DATABASE_URL not set, orders are stored in memory only");
            let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
            (store, None)
        }
    };

    let cache: Arc<dyn OrderCache> = match &config.redis_url {
        Some(url) => {
            let cache = RedisOrderCache::connect(url).await?;
            Arc::new(cache)
        }
        None => {
            warn!("REDIS_URL not set, order snapshots are cached in memory only");
            Arc::new(MemoryOrderCache::new())
        }
    };

    let pipeline =
        Pipeline::start(config.pipeline(), store, cache).context("invalid pipeline configuration")?;

    let state = AppState::new(&pipeline, RateLimiter::new(config.rate_limit_per_sec));
    let app = create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    pipeline.shutdown().await;
    if let Some(pool) = db_pool {
        pool.close().await;
    }

    info!("Gateway stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
