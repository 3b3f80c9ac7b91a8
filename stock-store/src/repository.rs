//! Stock ledger trait definition (Port)
//!
//! The ledger is the store of record for stock-on-hand.
//! Implementations can be PostgreSQL, in-memory, or mock for testing.

use crate::error::StoreError;
use async_trait::async_trait;
use stock_domain::{Adjustment, IdempotencyKey, ProductId, StockLevel, StockRecord};

/// Durable per-product stock counter
///
/// Every method resolves against the store of record. Implementations must
/// not cache quantities between calls.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Atomically apply a signed delta.
    ///
    /// Read, guard (`current + delta >= 0`) and write form one indivisible
    /// step. A product without a record is created when `delta >= 0` and is
    /// `NotFound` otherwise.
    ///
    /// With an idempotency key, a repeat of an already committed adjustment
    /// returns the original receipt flagged as `replayed` and changes nothing.
    async fn adjust(
        &self,
        product_id: ProductId,
        delta: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Adjustment, StoreError>;

    /// Find the full stock record for a product
    async fn find_record(&self, product_id: ProductId) -> Result<Option<StockRecord>, StoreError>;

    /// Unconditionally overwrite the quantity (insert or update).
    ///
    /// Returns the record as committed, including its write timestamp.
    async fn set(&self, product_id: ProductId, quantity: StockLevel) -> Result<StockRecord, StoreError>;

    /// Create the record if absent. Returns `true` if a record was created.
    async fn provision(&self, product_id: ProductId, initial: StockLevel) -> Result<bool, StoreError>;

    /// Delete the record (product deletion)
    async fn remove(&self, product_id: ProductId) -> Result<(), StoreError>;

    /// Point-in-time quantity on hand
    async fn read(&self, product_id: ProductId) -> Result<StockLevel, StoreError> {
        self.find_record(product_id)
            .await?
            .map(|record| record.quantity_on_hand)
            .ok_or_else(|| StoreError::not_found(product_id))
    }
}

/// Resolve a repeated idempotency key against the receipt stored for it.
pub(crate) fn replay_receipt(
    prior: Adjustment,
    product_id: ProductId,
    delta: i64,
    key: &IdempotencyKey,
) -> Result<Adjustment, StoreError> {
    if prior.product_id != product_id || prior.delta != delta {
        return Err(StoreError::idempotency_conflict(key.as_str()));
    }
    Ok(prior.into_replay())
}
