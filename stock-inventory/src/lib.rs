//! Inventory core.
//!
//! Validates stock adjustment intents, enforces the non-negative stock
//! invariant through the ledger, and maps failures onto a small error
//! taxonomy the transport layer can translate.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stock_inventory::{InventoryError, InventoryService, StockService};
//! use stock_store::MemoryLedger;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = StockService::new(Arc::new(MemoryLedger::new()));
//!     let product_id = Uuid::now_v7();
//!
//!     service.set_absolute(product_id, 5).await.unwrap();
//!     service.decrease(product_id, 3, None).await.unwrap();
//!
//!     let err = service.decrease(product_id, 3, None).await.unwrap_err();
//!     assert!(matches!(err, InventoryError::InsufficientStock { .. }));
//! }
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod service;

pub use error::{InventoryError, InventoryResult};
pub use service::{InventoryService, StockService};
