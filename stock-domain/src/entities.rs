//! Domain Entities for stock control
//!
//! A stock record is the per-product counter; an adjustment is the receipt
//! a ledger hands back after committing a delta.

use crate::value_objects::StockLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a catalog product
pub type ProductId = Uuid;

// =============================================================================
// StockRecord
// =============================================================================

/// Stock-on-hand for a single product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Product this counter belongs to
    pub product_id: ProductId,
    /// Units currently on hand
    pub quantity_on_hand: StockLevel,
    /// Time of the last committed write
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Create a record stamped with the current time
    pub fn new(product_id: ProductId, quantity_on_hand: StockLevel) -> Self {
        Self {
            product_id,
            quantity_on_hand,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Adjustment
// =============================================================================

/// Receipt for a committed stock adjustment
///
/// `replayed` is set when the ledger recognised an idempotency key and
/// returned the result of an earlier commit without applying the delta again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Product that was adjusted
    pub product_id: ProductId,
    /// Signed change that was applied
    pub delta: i64,
    /// Quantity on hand right after the commit
    pub new_quantity: StockLevel,
    /// True when an earlier commit was returned instead of applying again
    pub replayed: bool,
}

impl Adjustment {
    /// Receipt for a freshly committed delta
    pub fn committed(product_id: ProductId, delta: i64, new_quantity: StockLevel) -> Self {
        Self {
            product_id,
            delta,
            new_quantity,
            replayed: false,
        }
    }

    /// Same receipt, flagged as a replay of an earlier commit
    pub fn into_replay(self) -> Self {
        Self {
            replayed: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjustment_replay_keeps_values() {
        let id = Uuid::now_v7();
        let receipt = Adjustment::committed(id, -2, StockLevel::new(3).unwrap());
        let replay = receipt.into_replay();

        assert!(!receipt.replayed);
        assert!(replay.replayed);
        assert_eq!(replay.new_quantity, receipt.new_quantity);
        assert_eq!(replay.delta, -2);
    }
}
