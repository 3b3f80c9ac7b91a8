//! Prometheus metrics for stock operations.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use stock_domain::Adjustment;
use stock_inventory::{InventoryError, InventoryResult};

use crate::error::DaemonResult;

/// Daemon metrics registry.
pub struct Metrics {
    registry: Registry,
    adjustments: IntCounterVec,
}

impl Metrics {
    /// Create a registry with all daemon collectors registered.
    pub fn new() -> DaemonResult<Self> {
        let registry = Registry::new();

        let adjustments = IntCounterVec::new(
            Opts::new("stock_adjustments_total", "Stock adjustment requests by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(adjustments.clone()))?;

        Ok(Self {
            registry,
            adjustments,
        })
    }

    /// Count one adjustment attempt.
    pub fn record_adjustment(&self, operation: &str, result: &InventoryResult<Adjustment>) {
        let outcome = match result {
            Ok(receipt) if receipt.replayed => "replayed",
            Ok(_) => "ok",
            Err(e) => error_label(e),
        };
        self.adjustments.with_label_values(&[operation, outcome]).inc();
    }

    /// Current count for a label pair.
    pub fn adjustment_count(&self, operation: &str, outcome: &str) -> u64 {
        self.adjustments.with_label_values(&[operation, outcome]).get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> DaemonResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn error_label(err: &InventoryError) -> &'static str {
    match err {
        InventoryError::InvalidArgument(_) => "invalid_argument",
        InventoryError::InsufficientStock { .. } => "insufficient_stock",
        InventoryError::NotFound(_) => "not_found",
        InventoryError::IdempotencyConflict(_) => "idempotency_conflict",
        InventoryError::StoreUnavailable(_) => "store_unavailable",
        InventoryError::Internal(_) => "internal",
    }
}
