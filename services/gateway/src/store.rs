//! Postgres-backed [`OrderStore`]

use anyhow::Context;
use async_trait::async_trait;
use order_pipeline::{OrderStore, StoreError};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use types::ids::OrderId;
use types::order::{Order, OrderStatus};

const INSERT_ORDER: &str = "INSERT INTO orders (user_id, symbol, side, price, quantity, status) \
                            VALUES ($1, $2, $3, $4, $5, $6) RETURNING id";

const UPDATE_STATUS: &str = "UPDATE orders SET status = $1 WHERE id = $2";

/// Connect a pool to `url`.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<OrderId, StoreError> {
        let price: Decimal = order.price.as_decimal();
        let quantity: Decimal = order.quantity.as_decimal();

        let id: i64 = sqlx::query_scalar(INSERT_ORDER)
            .bind(order.user_id.as_i64())
            .bind(order.symbol.as_str())
            .bind(order.side.as_str())
            .bind(price)
            .bind(quantity)
            .bind(order.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(OrderId::new(id))
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), StoreError> {
        let result = sqlx::query(UPDATE_STATUS)
            .bind(status.as_str())
            .bind(order_id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order_id));
        }
        Ok(())
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}
