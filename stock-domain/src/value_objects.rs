//! Value Objects for the stock domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Requested quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Stock level must be non-negative
    #[error("Invalid stock level: {0}")]
    InvalidStockLevel(String),

    /// Idempotency key is empty or too long
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),

    /// Applying a delta would overflow the counter
    #[error("Stock arithmetic overflow: {0}")]
    Overflow(String),
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity is a positive number of units requested by a caller
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value <= 0 {
            return Err(DomainError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying unit count
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Signed delta that adds this quantity to stock
    pub fn as_increase(&self) -> i64 {
        self.0
    }

    /// Signed delta that removes this quantity from stock
    pub fn as_decrease(&self) -> i64 {
        -self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// StockLevel
// =============================================================================

/// StockLevel is the stock-on-hand counter of a product
///
/// # Invariants
/// - Must be >= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct StockLevel(i64);

impl StockLevel {
    /// Empty stock
    pub const ZERO: StockLevel = StockLevel(0);

    /// Create a new StockLevel with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStockLevel` if value < 0
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value < 0 {
            return Err(DomainError::InvalidStockLevel(format!(
                "Stock level cannot be negative, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Get the underlying unit count
    pub fn get(&self) -> i64 {
        self.0
    }

    /// Level after applying `delta`.
    ///
    /// Returns `Ok(None)` when the result would be negative, which callers
    /// turn into an insufficient-stock rejection.
    ///
    /// # Errors
    /// Returns `DomainError::Overflow` if the sum does not fit in an i64
    pub fn apply(&self, delta: i64) -> Result<Option<StockLevel>, DomainError> {
        let candidate = self.0.checked_add(delta).ok_or_else(|| {
            DomainError::Overflow(format!("{} + {} overflows", self.0, delta))
        })?;
        if candidate < 0 {
            return Ok(None);
        }
        Ok(Some(Self(candidate)))
    }

    /// Whether at least `quantity` units are on hand
    pub fn covers(&self, quantity: Quantity) -> bool {
        self.0 >= quantity.get()
    }
}

impl TryFrom<i64> for StockLevel {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StockLevel> for i64 {
    fn from(level: StockLevel) -> Self {
        level.0
    }
}

impl fmt::Display for StockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// IdempotencyKey
// =============================================================================

/// Caller-chosen token that makes a retried adjustment replay its first result
///
/// # Invariants
/// - 1..=128 bytes after trimming
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Maximum key length in bytes
    pub const MAX_LEN: usize = 128;

    /// Create a new IdempotencyKey with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidIdempotencyKey` if empty or longer than `MAX_LEN`
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidIdempotencyKey("Key cannot be empty".to_string()));
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(DomainError::InvalidIdempotencyKey(format!(
                "Key exceeds {} bytes",
                Self::MAX_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(key: IdempotencyKey) -> Self {
        key.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_validation() {
        assert!(Quantity::new(1).is_ok());
        assert!(Quantity::new(10_000).is_ok());
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-3).is_err());
    }

    #[test]
    fn test_quantity_deltas() {
        let q = Quantity::new(7).unwrap();
        assert_eq!(q.as_increase(), 7);
        assert_eq!(q.as_decrease(), -7);
    }

    #[test]
    fn test_stock_level_validation() {
        assert!(StockLevel::new(0).is_ok());
        assert!(StockLevel::new(42).is_ok());
        assert!(StockLevel::new(-1).is_err());
    }

    #[test]
    fn test_stock_level_apply() {
        let level = StockLevel::new(5).unwrap();

        assert_eq!(level.apply(-3).unwrap(), Some(StockLevel::new(2).unwrap()));
        assert_eq!(level.apply(-5).unwrap(), Some(StockLevel::ZERO));
        assert_eq!(level.apply(-6).unwrap(), None);
        assert_eq!(level.apply(10).unwrap(), Some(StockLevel::new(15).unwrap()));
    }

    #[test]
    fn test_stock_level_apply_overflow() {
        let level = StockLevel::new(i64::MAX).unwrap();
        assert!(matches!(level.apply(1), Err(DomainError::Overflow(_))));
    }

    #[test]
    fn test_stock_level_covers() {
        let level = StockLevel::new(3).unwrap();
        assert!(level.covers(Quantity::new(3).unwrap()));
        assert!(!level.covers(Quantity::new(4).unwrap()));
    }

    #[test]
    fn test_serde_rejects_negative_level() {
        let ok: StockLevel = serde_json::from_str("4").unwrap();
        assert_eq!(ok.get(), 4);
        assert!(serde_json::from_str::<StockLevel>("-1").is_err());
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_idempotency_key_validation() {
        assert_eq!(IdempotencyKey::new("  order-17 ").unwrap().as_str(), "order-17");
        assert!(IdempotencyKey::new("   ").is_err());
        assert!(IdempotencyKey::new("x".repeat(129)).is_err());
    }
}
