//! Daemon error types.

use stock_inventory::InventoryError;
use stock_store::StoreError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Inventory error
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Database setup error (pool, migrations)
    #[error("Database error: {0}")]
    Database(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server I/O error
    #[error("Server error: {0}")]
    Server(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
