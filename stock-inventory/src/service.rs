//! Inventory service: validates stock intents and turns them into ledger calls.
//!
//! Every mutation is exactly one ledger operation. In particular `decrease`
//! never consults `is_available` first: the ledger's atomic adjust is the
//! only gate, so two concurrent decreases cannot both pass a check against
//! the same pre-decrement value.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use stock_domain::{Adjustment, IdempotencyKey, ProductId, Quantity, StockLevel, StockRecord};
use stock_store::StockLedger;

use crate::error::{InventoryError, InventoryResult};

// =============================================================================
// Service interface
// =============================================================================

/// Inventory operations consumed by the transport layer.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Whether at least `quantity` units are on hand right now.
    ///
    /// Advisory only: the answer can be stale by the time the caller acts.
    async fn is_available(&self, product_id: ProductId, quantity: i64) -> InventoryResult<bool>;

    /// Add `quantity` (> 0) units.
    async fn increase(
        &self,
        product_id: ProductId,
        quantity: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment>;

    /// Remove `quantity` (> 0) units, failing with `InsufficientStock` rather
    /// than going negative.
    async fn decrease(
        &self,
        product_id: ProductId,
        quantity: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment>;

    /// Raw signed relative write.
    ///
    /// Skips the positive-quantity validation of `increase`/`decrease`; the
    /// caller is responsible for the sign and size of the change. The ledger
    /// still refuses to commit a negative result.
    async fn update_stock(
        &self,
        product_id: ProductId,
        quantity_change: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment>;

    /// Administrative overwrite to `quantity` (>= 0). Returns the committed record.
    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> InventoryResult<StockRecord>;

    /// Current stock record.
    async fn stock_level(&self, product_id: ProductId) -> InventoryResult<StockRecord>;

    /// Create the stock record for a newly created product. Returns `false`
    /// if it already existed.
    async fn provision(&self, product_id: ProductId, initial: i64) -> InventoryResult<bool>;

    /// Drop the stock record of a deleted product.
    async fn retire(&self, product_id: ProductId) -> InventoryResult<()>;
}

// =============================================================================
// Ledger-backed implementation
// =============================================================================

/// Inventory service backed by a [`StockLedger`].
pub struct StockService<L: StockLedger> {
    ledger: Arc<L>,
}

impl<L: StockLedger> StockService<L> {
    /// Create a new service over the given ledger.
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    async fn apply(
        &self,
        operation: &'static str,
        product_id: ProductId,
        delta: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment> {
        match self.ledger.adjust(product_id, delta, idempotency_key).await {
            Ok(receipt) => {
                info!(
                    operation,
                    %product_id,
                    delta,
                    new_quantity = %receipt.new_quantity,
                    replayed = receipt.replayed,
                    "Stock adjusted"
                );
                Ok(receipt)
            },
            Err(e) => Err(observe(operation, product_id, e.into())),
        }
    }
}

/// Log a failed operation at a level matching its category.
fn observe(operation: &'static str, product_id: ProductId, err: InventoryError) -> InventoryError {
    match &err {
        InventoryError::InvalidArgument(_) | InventoryError::NotFound(_) => {
            debug!(operation, %product_id, error = %err, "Stock request rejected");
        },
        InventoryError::InsufficientStock { .. } | InventoryError::IdempotencyConflict(_) => {
            warn!(operation, %product_id, error = %err, "Stock request rejected");
        },
        InventoryError::StoreUnavailable(_) => {
            warn!(operation, %product_id, error = %err, "Stock store unavailable");
        },
        InventoryError::Internal(_) => {
            error!(operation, %product_id, error = ?err, "Stock operation failed");
        },
    }
    err
}

#[async_trait]
impl<L: StockLedger + 'static> InventoryService for StockService<L> {
    async fn is_available(&self, product_id: ProductId, quantity: i64) -> InventoryResult<bool> {
        let quantity = Quantity::new(quantity).map_err(|e| observe("is_available", product_id, e.into()))?;

        let on_hand = self
            .ledger
            .read(product_id)
            .await
            .map_err(|e| observe("is_available", product_id, e.into()))?;

        Ok(on_hand.covers(quantity))
    }

    async fn increase(
        &self,
        product_id: ProductId,
        quantity: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment> {
        let quantity = Quantity::new(quantity).map_err(|e| observe("increase", product_id, e.into()))?;
        self.apply("increase", product_id, quantity.as_increase(), idempotency_key).await
    }

    async fn decrease(
        &self,
        product_id: ProductId,
        quantity: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment> {
        let quantity = Quantity::new(quantity).map_err(|e| observe("decrease", product_id, e.into()))?;
        self.apply("decrease", product_id, quantity.as_decrease(), idempotency_key).await
    }

    async fn update_stock(
        &self,
        product_id: ProductId,
        quantity_change: i64,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> InventoryResult<Adjustment> {
        self.apply("update_stock", product_id, quantity_change, idempotency_key).await
    }

    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> InventoryResult<StockRecord> {
        let level = StockLevel::new(quantity).map_err(|e| observe("set_absolute", product_id, e.into()))?;

        let record = self
            .ledger
            .set(product_id, level)
            .await
            .map_err(|e| observe("set_absolute", product_id, e.into()))?;

        info!(%product_id, quantity = %record.quantity_on_hand, "Stock overwritten");
        Ok(record)
    }

    async fn stock_level(&self, product_id: ProductId) -> InventoryResult<StockRecord> {
        self.ledger
            .find_record(product_id)
            .await
            .map_err(|e| observe("stock_level", product_id, e.into()))?
            .ok_or_else(|| observe("stock_level", product_id, InventoryError::NotFound(product_id)))
    }

    async fn provision(&self, product_id: ProductId, initial: i64) -> InventoryResult<bool> {
        let initial = StockLevel::new(initial).map_err(|e| observe("provision", product_id, e.into()))?;

        let created = self
            .ledger
            .provision(product_id, initial)
            .await
            .map_err(|e| observe("provision", product_id, e.into()))?;

        if created {
            info!(%product_id, initial = %initial, "Stock record provisioned");
        } else {
            debug!(%product_id, "Stock record already provisioned");
        }
        Ok(created)
    }

    async fn retire(&self, product_id: ProductId) -> InventoryResult<()> {
        self.ledger
            .remove(product_id)
            .await
            .map_err(|e| observe("retire", product_id, e.into()))?;

        info!(%product_id, "Stock record retired");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
