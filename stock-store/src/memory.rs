//! In-memory ledger implementation
//!
//! Used for testing and development without a database. Only correct within
//! a single process: every adjustment runs while holding the product's map
//! entry, which plays the role of the row lock in PostgreSQL.

use crate::error::StoreError;
use crate::repository::{replay_receipt, StockLedger};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use stock_domain::{Adjustment, IdempotencyKey, ProductId, StockLevel, StockRecord};

/// In-memory ledger for testing
///
/// Idempotency receipts are kept for the life of the ledger, like the rows of
/// `stock_adjustments` in PostgreSQL: `set` and `remove` never drop them, so a
/// retried key keeps replaying. Memory therefore grows with every keyed
/// adjustment, which is why this ledger is meant for tests and development.
/// `clear` resets both maps.
pub struct MemoryLedger {
    records: DashMap<ProductId, StockRecord>,
    receipts: DashMap<IdempotencyKey, Adjustment>,
}

impl MemoryLedger {
    /// Create a new empty in-memory ledger
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            receipts: DashMap::new(),
        }
    }

    /// Get the number of stock records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Get the number of stored idempotency receipts
    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    /// Clear all data (useful for test setup)
    pub fn clear(&self) {
        self.records.clear();
        self.receipts.clear();
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StockLedger for MemoryLedger {
    async fn adjust(
        &self,
        product_id: ProductId,
        delta: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Adjustment, StoreError> {
        // Lock order is always record entry, then receipt entry.
        let record = self.records.entry(product_id);

        let receipt_slot = match idempotency_key {
            Some(key) => match self.receipts.entry(key.clone()) {
                Entry::Occupied(prior) => {
                    return replay_receipt(*prior.get(), product_id, delta, key);
                },
                Entry::Vacant(slot) => Some(slot),
            },
            None => None,
        };

        let current = match &record {
            Entry::Occupied(existing) => existing.get().quantity_on_hand,
            Entry::Vacant(_) if delta >= 0 => StockLevel::ZERO,
            Entry::Vacant(_) => return Err(StoreError::not_found(product_id)),
        };

        let new_quantity = current
            .apply(delta)?
            .ok_or_else(|| StoreError::insufficient(product_id, current, delta))?;

        let updated = StockRecord::new(product_id, new_quantity);
        match record {
            Entry::Occupied(mut existing) => {
                existing.insert(updated);
            },
            Entry::Vacant(slot) => {
                slot.insert(updated);
            },
        }

        let receipt = Adjustment::committed(product_id, delta, new_quantity);
        if let Some(slot) = receipt_slot {
            slot.insert(receipt);
        }

        Ok(receipt)
    }

    async fn find_record(&self, product_id: ProductId) -> Result<Option<StockRecord>, StoreError> {
        Ok(self.records.get(&product_id).map(|r| r.value().clone()))
    }

    async fn set(&self, product_id: ProductId, quantity: StockLevel) -> Result<StockRecord, StoreError> {
        let record = StockRecord::new(product_id, quantity);
        self.records.insert(product_id, record.clone());
        Ok(record)
    }

    async fn provision(&self, product_id: ProductId, initial: StockLevel) -> Result<bool, StoreError> {
        match self.records.entry(product_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(StockRecord::new(product_id, initial));
                Ok(true)
            },
        }
    }

    async fn remove(&self, product_id: ProductId) -> Result<(), StoreError> {
        self.records
            .remove(&product_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(product_id))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn level(n: i64) -> StockLevel {
        StockLevel::new(n).unwrap()
    }

    async fn ledger_with(product_id: ProductId, quantity: i64) -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.set(product_id, level(quantity)).await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_adjust_applies_delta() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 5).await;

        let receipt = ledger.adjust(id, -3, None).await.unwrap();
        assert_eq!(receipt.new_quantity, level(2));
        assert!(!receipt.replayed);
        assert_eq!(ledger.read(id).await.unwrap(), level(2));
    }

    #[tokio::test]
    async fn test_adjust_rejects_negative_result() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 2).await;

        let err = ledger.adjust(id, -3, None).await.unwrap_err();
        match err {
            StoreError::InsufficientStock { available, delta, .. } => {
                assert_eq!(available, level(2));
                assert_eq!(delta, -3);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ledger.read(id).await.unwrap(), level(2));
    }

    #[tokio::test]
    async fn test_adjust_unknown_product() {
        let ledger = MemoryLedger::new();
        let id = Uuid::now_v7();

        let err = ledger.adjust(id, -1, None).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(ledger.record_count(), 0);

        // Adding stock creates the record implicitly
        let receipt = ledger.adjust(id, 4, None).await.unwrap();
        assert_eq!(receipt.new_quantity, level(4));
        assert_eq!(ledger.record_count(), 1);
    }

    #[tokio::test]
    async fn test_read_unknown_product() {
        let ledger = MemoryLedger::new();
        let err = ledger.read(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 40).await;

        ledger.set(id, level(5)).await.unwrap();
        assert_eq!(ledger.read(id).await.unwrap(), level(5));
    }

    #[tokio::test]
    async fn test_provision_never_overwrites() {
        let id = Uuid::now_v7();
        let ledger = MemoryLedger::new();

        assert!(ledger.provision(id, level(3)).await.unwrap());
        assert!(!ledger.provision(id, level(99)).await.unwrap());
        assert_eq!(ledger.read(id).await.unwrap(), level(3));
    }

    #[tokio::test]
    async fn test_remove() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 1).await;

        ledger.remove(id).await.unwrap();
        assert!(ledger.find_record(id).await.unwrap().is_none());
        assert!(matches!(ledger.remove(id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_idempotent_replay() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 10).await;
        let key = IdempotencyKey::new("checkout-1").unwrap();

        let first = ledger.adjust(id, -4, Some(&key)).await.unwrap();
        let second = ledger.adjust(id, -4, Some(&key)).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.new_quantity, level(6));
        assert_eq!(ledger.read(id).await.unwrap(), level(6));
        assert_eq!(ledger.receipt_count(), 1);
    }

    #[tokio::test]
    async fn test_idempotency_conflict() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 10).await;
        let key = IdempotencyKey::new("checkout-2").unwrap();

        ledger.adjust(id, -4, Some(&key)).await.unwrap();
        let err = ledger.adjust(id, -5, Some(&key)).await.unwrap_err();
        assert!(matches!(err, StoreError::IdempotencyConflict { .. }));
        assert_eq!(ledger.read(id).await.unwrap(), level(6));
    }

    #[tokio::test]
    async fn test_rejected_adjust_stores_no_receipt() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 1).await;
        let key = IdempotencyKey::new("checkout-3").unwrap();

        assert!(ledger.adjust(id, -2, Some(&key)).await.is_err());
        assert_eq!(ledger.receipt_count(), 0);

        ledger.set(id, level(5)).await.unwrap();
        let receipt = ledger.adjust(id, -2, Some(&key)).await.unwrap();
        assert!(!receipt.replayed);
        assert_eq!(receipt.new_quantity, level(3));
    }

    #[tokio::test]
    async fn test_receipts_outlive_overwrite_and_removal() {
        let id = Uuid::now_v7();
        let ledger = ledger_with(id, 10).await;
        let key = IdempotencyKey::new("checkout-4").unwrap();

        ledger.adjust(id, 3, Some(&key)).await.unwrap();
        ledger.set(id, level(1)).await.unwrap();
        ledger.remove(id).await.unwrap();
        assert_eq!(ledger.receipt_count(), 1);

        // A late retry replays rather than recreating the record.
        let retry = ledger.adjust(id, 3, Some(&key)).await.unwrap();
        assert!(retry.replayed);
        assert_eq!(retry.new_quantity, level(13));
        assert_eq!(ledger.record_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_decrements_never_oversell() {
        let id = Uuid::now_v7();
        let ledger = Arc::new(ledger_with(id, 25).await);

        let mut handles = Vec::new();
        for _ in 0..100 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.adjust(id, -1, None).await }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 25);
        assert_eq!(rejected, 75);
        assert_eq!(ledger.read(id).await.unwrap(), StockLevel::ZERO);
    }

    #[tokio::test]
    async fn test_clear() {
        let ledger = MemoryLedger::new();
        let key = IdempotencyKey::new("k").unwrap();
        ledger.adjust(Uuid::now_v7(), 1, Some(&key)).await.unwrap();

        ledger.clear();

        assert_eq!(ledger.record_count(), 0);
        assert_eq!(ledger.receipt_count(), 0);
    }
}
