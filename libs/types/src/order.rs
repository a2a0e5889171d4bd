//! Order value record and lifecycle status
//!
//! An [`Order`] is created from an [`OrderSubmission`] with status `pending`.
//! Only `status` changes afterwards, and only the pipeline stage owning that
//! transition changes it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ValidationError;
use crate::ids::{OrderId, Symbol, UserId};
use crate::numeric::{Price, Quantity};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse the wire representation. Exactly "buy" or "sell".
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(ValidationError::InvalidSide(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-order lifecycle
///
/// ```text
/// pending ──► persisted ──► completed
///    │            │
///    └────────────┴──────► failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Enqueued, not yet durably recorded
    Pending,
    /// Durable row exists and the book holds the order
    Persisted,
    /// Status update written back (terminal)
    Completed,
    /// A stage reported an unrecoverable error (terminal)
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Whether `self → next` is an edge of the lifecycle
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Persisted)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Persisted, OrderStatus::Completed)
                | (OrderStatus::Persisted, OrderStatus::Failed)
        )
    }

    /// Value written to the store's status column
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Persisted => "persisted",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub status: OrderStatus,
}

impl Order {
    /// Create a new pending order
    pub fn new(user_id: UserId, symbol: Symbol, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            user_id,
            symbol,
            side,
            price,
            quantity,
            status: OrderStatus::Pending,
        }
    }
}

/// An order together with the identifier the store assigned to it
///
/// This is what the order book holds and what gets cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedOrder {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub order: Order,
}

impl PersistedOrder {
    pub fn symbol(&self) -> &Symbol {
        &self.order.symbol
    }
}

/// Raw submission as received at the network boundary
///
/// Field names follow snake_case; the original service's Go-style keys
/// (`UserID`, `Symbol`, ...) are accepted as aliases. Price and quantity take
/// either JSON numbers or decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmission {
    #[serde(alias = "UserID", alias = "userId")]
    pub user_id: i64,
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(alias = "Side")]
    pub side: String,
    #[serde(alias = "Price")]
    pub price: Decimal,
    #[serde(alias = "Quantity")]
    pub quantity: Decimal,
}

impl OrderSubmission {
    /// Validate into a pending [`Order`]
    pub fn validate(self) -> Result<Order, ValidationError> {
        let symbol = Symbol::try_new(self.symbol)?;
        let side = Side::parse(&self.side)?;
        let price = Price::try_new(self.price)?;
        let quantity = Quantity::try_new(self.quantity)?;

        Ok(Order::new(UserId::new(self.user_id), symbol, side, price, quantity))
    }
}
