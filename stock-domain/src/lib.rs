//! Stock domain layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains the stock record, adjustment receipts, and validated quantities.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{Adjustment, ProductId, StockRecord};
pub use value_objects::{DomainError, IdempotencyKey, Quantity, StockLevel};
