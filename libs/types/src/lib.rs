//! Types library for the order intake pipeline
//!
//! Core type definitions shared by the pipeline and the gateway.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, SubmissionId, UserId, Symbol)
//! - `numeric`: Strictly positive decimal types (Price, Quantity)
//! - `order`: Order value record, lifecycle status and raw submissions
//! - `errors`: Validation error taxonomy

pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
}
