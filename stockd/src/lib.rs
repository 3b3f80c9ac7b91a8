//! Stock daemon library
//!
//! Runtime for the catalog's inventory stock-control service.
//!
//! # Architecture
//!
//! ```text
//! HTTP client → API Server → InventoryService → StockLedger → MemoryLedger | PostgreSQL
//!                   ↓
//!                Metrics
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **API**: HTTP endpoints for availability checks and stock adjustments
//! - **Metrics**: Prometheus counters for adjustment outcomes
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use stockd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let daemon = Daemon::new_in_memory(config).expect("Failed to build daemon");
//!     daemon.run().await.expect("Daemon error");
//! }
//! ```

#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod daemon;
#[cfg(feature = "postgres")]
pub mod db;
pub mod error;
pub mod metrics;

// Re-exports for convenience
pub use config::{ApiConfig, Config, DatabaseConfig, Environment};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
pub use metrics::Metrics;
