//! Stock Ledger Store
//!
//! Provides the store of record for per-product stock-on-hand.
//!
//! # Architecture
//!
//! - **Ledger trait**: Defines the storage interface (port)
//! - **In-memory ledger**: Single-process implementation for tests and development
//! - **PostgreSQL ledger**: Production implementation (feature `postgres`)
//!
//! # Usage
//!
//! ```rust
//! use stock_store::{MemoryLedger, StockLedger};
//! use stock_domain::StockLevel;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() {
//!     let ledger = MemoryLedger::new();
//!     let product_id = Uuid::now_v7();
//!
//!     ledger.set(product_id, StockLevel::new(5).unwrap()).await.unwrap();
//!
//!     // Decrement is guarded atomically; no separate availability check
//!     let receipt = ledger.adjust(product_id, -3, None).await.unwrap();
//!     assert_eq!(receipt.new_quantity.get(), 2);
//!
//!     assert!(ledger.adjust(product_id, -3, None).await.is_err());
//! }
//! ```

#![warn(clippy::all)]

// Modules
mod error;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;
mod repository;

// Re-exports
pub use error::StoreError;
pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgStockLedger;
pub use repository::StockLedger;
