//! Inventory error taxonomy.

use stock_domain::{DomainError, ProductId, StockLevel};
use stock_store::StoreError;
use thiserror::Error;

/// Errors surfaced by inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Caller misuse (non-positive quantity, negative target level)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Decrease would have driven stock below zero
    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        /// Product that was adjusted
        product_id: ProductId,
        /// Quantity on hand when the decrease was rejected
        available: StockLevel,
        /// Units the caller tried to remove
        requested: i64,
    },

    /// Unknown product
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// Idempotency key already used for a different adjustment
    #[error("Idempotency key already used for a different adjustment: {0}")]
    IdempotencyConflict(String),

    /// Transient infrastructure failure
    #[error("Stock store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InventoryError {
    /// Whether the caller may retry (with backoff).
    ///
    /// Only transient store failures qualify. A retry of an adjustment should
    /// carry an idempotency key, or first confirm the current level, since
    /// the failed attempt may already have committed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { product_id } => InventoryError::NotFound(product_id),
            StoreError::InsufficientStock {
                product_id,
                available,
                delta,
            } => InventoryError::InsufficientStock {
                product_id,
                available,
                requested: delta.saturating_neg(),
            },
            StoreError::IdempotencyConflict { key } => InventoryError::IdempotencyConflict(key),
            StoreError::Unavailable(msg) => InventoryError::StoreUnavailable(msg),
            StoreError::Domain(e) => e.into(),
            StoreError::Database(msg) => InventoryError::Internal(format!("database: {}", msg)),
            StoreError::Deserialization(msg) => {
                InventoryError::Internal(format!("corrupt stock record: {}", msg))
            },
        }
    }
}

impl From<DomainError> for InventoryError {
    fn from(err: DomainError) -> Self {
        InventoryError::InvalidArgument(err.to_string())
    }
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
