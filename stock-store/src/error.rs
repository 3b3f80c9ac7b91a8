//! Storage layer errors

use stock_domain::{ProductId, StockLevel};
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// No stock record exists for the product
    #[error("Stock record not found for product {product_id}")]
    NotFound {
        /// Product that was looked up
        product_id: ProductId,
    },

    /// The guarded write would have driven stock below zero
    #[error("Insufficient stock for product {product_id}: {available} on hand, delta {delta}")]
    InsufficientStock {
        /// Product that was adjusted
        product_id: ProductId,
        /// Quantity on hand when the adjustment was rejected
        available: StockLevel,
        /// Signed delta that was rejected
        delta: i64,
    },

    /// Idempotency key already used for a different adjustment
    #[error("Idempotency key {key} was already used for a different adjustment")]
    IdempotencyConflict {
        /// The reused key
        key: String,
    },

    /// Store could not be reached or timed out; safe to retry
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Stored data violates a domain invariant
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] stock_domain::DomainError),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(product_id: ProductId) -> Self {
        Self::NotFound { product_id }
    }

    /// Create an insufficient stock error
    pub fn insufficient(product_id: ProductId, available: StockLevel, delta: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            available,
            delta,
        }
    }

    /// Create an idempotency conflict error
    pub fn idempotency_conflict(key: impl Into<String>) -> Self {
        Self::IdempotencyConflict { key: key.into() }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            },
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                // 57014 query_canceled (statement_timeout), 40001 serialization_failure,
                // 40P01 deadlock_detected
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                let transient = matches!(code.as_str(), "57014" | "40001" | "40P01");
                if code == "22003" {
                    // numeric_value_out_of_range: BIGINT overflow on increase
                    StoreError::Domain(stock_domain::DomainError::Overflow(db_err.to_string()))
                } else if transient {
                    StoreError::Unavailable(db_err.to_string())
                } else {
                    StoreError::Database(db_err.to_string())
                }
            },
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_only_unavailable_is_transient() {
        let id = Uuid::now_v7();
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::not_found(id).is_transient());
        assert!(!StoreError::insufficient(id, StockLevel::ZERO, -1).is_transient());
        assert!(!StoreError::Database("syntax".into()).is_transient());
    }
}
