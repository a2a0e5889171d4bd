//! Submission validation errors
//!
//! Anything in here is the submitter's fault and is reported synchronously;
//! an order that fails validation never reaches the intake queue.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ids::MAX_SYMBOL_LEN;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("symbol is {len} bytes, limit is {}", MAX_SYMBOL_LEN)]
    SymbolTooLong { len: usize },

    #[error("symbol must not start or end with whitespace")]
    SymbolWhitespace,

    #[error("side must be \"buy\" or \"sell\", got {0:?}")]
    InvalidSide(String),

    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::InvalidSide("hold".to_string());
        assert_eq!(err.to_string(), "side must be \"buy\" or \"sell\", got \"hold\"");

        let err = ValidationError::NonPositivePrice(Decimal::from(-5));
        assert_eq!(err.to_string(), "price must be positive, got -5");
    }
}
