//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together:
//! - Inventory service (over the in-memory or PostgreSQL ledger)
//! - Metrics registry
//! - API Server (HTTP endpoints)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build the ledger and inventory service
//! 3. Start API server
//! 4. Wait for SIGINT
//! 5. Graceful shutdown: stop accepting connections, drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use stock_inventory::{InventoryService, StockService};
use stock_store::MemoryLedger;

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::metrics::Metrics;

// =============================================================================
// Daemon
// =============================================================================

/// The stock daemon.
pub struct Daemon<I: InventoryService + 'static> {
    /// Configuration
    config: Config,
    /// Inventory service
    inventory: Arc<I>,
    /// Metrics registry
    metrics: Arc<Metrics>,
}

impl Daemon<StockService<MemoryLedger>> {
    /// Create a daemon over the in-memory ledger (tests, development).
    pub fn new_in_memory(config: Config) -> DaemonResult<Self> {
        let ledger = Arc::new(MemoryLedger::new());
        let inventory = Arc::new(StockService::new(ledger));
        Self::new(config, inventory)
    }
}

#[cfg(feature = "postgres")]
impl Daemon<StockService<stock_store::PgStockLedger>> {
    /// Create a daemon over the PostgreSQL ledger.
    ///
    /// Pending migrations are applied before the daemon accepts traffic.
    pub async fn connect(config: Config) -> DaemonResult<Self> {
        let url = config
            .database
            .url
            .clone()
            .ok_or_else(|| DaemonError::Config("DATABASE_URL is not set".to_string()))?;

        let pool = stock_db::connect(&url, &config.database.pool_settings())
            .await
            .map_err(|e| DaemonError::Database(e.to_string()))?;
        stock_db::migrate(&pool)
            .await
            .map_err(|e| DaemonError::Database(e.to_string()))?;

        let ledger = Arc::new(stock_store::PgStockLedger::new(Arc::new(pool)));
        let inventory = Arc::new(StockService::new(ledger));
        Self::new(config, inventory)
    }
}

impl<I: InventoryService + 'static> Daemon<I> {
    /// Create a new daemon with the provided inventory service.
    pub fn new(config: Config, inventory: Arc<I>) -> DaemonResult<Self> {
        Ok(Self {
            config,
            inventory,
            metrics: Arc::new(Metrics::new()?),
        })
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting stock daemon"
        );

        let shutdown = CancellationToken::new();
        let (api_addr, server) = self.start_api_server(shutdown.clone()).await?;
        info!(%api_addr, "API server started");

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| DaemonError::Server(format!("Failed to listen for shutdown signal: {}", e)))?;
        info!("Received shutdown signal");

        shutdown.cancel();
        server
            .await
            .map_err(|e| DaemonError::Server(format!("API server task failed: {}", e)))?;

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the API server.
    ///
    /// The server drains in-flight requests and exits once `shutdown` is cancelled.
    async fn start_api_server(
        &self,
        shutdown: CancellationToken,
    ) -> DaemonResult<(SocketAddr, JoinHandle<()>)> {
        let state = Arc::new(ApiState {
            inventory: self.inventory.clone(),
            metrics: self.metrics.clone(),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Failed to get local address: {}", e)))?;

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "API server error");
            }
        });

        Ok((local_addr, handle))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_daemon_in_memory_creation() {
        let daemon = Daemon::new_in_memory(Config::test()).unwrap();

        daemon.inventory.set_absolute(Uuid::now_v7(), 3).await.unwrap();
        assert_eq!(daemon.inventory.ledger().record_count(), 1);
    }

    #[tokio::test]
    async fn test_daemon_api_server_start_and_shutdown() {
        let daemon = Daemon::new_in_memory(Config::test()).unwrap();
        let shutdown = CancellationToken::new();

        let (addr, handle) = daemon.start_api_server(shutdown.clone()).await.unwrap();
        assert!(addr.port() > 0);

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_daemon_serves_stock_endpoints() {
        let daemon = Daemon::new_in_memory(Config::test()).unwrap();
        let id = Uuid::now_v7();
        daemon.inventory.set_absolute(id, 2).await.unwrap();

        let shutdown = CancellationToken::new();
        let (addr, handle) = daemon.start_api_server(shutdown.clone()).await.unwrap();

        let client = reqwest::Client::new();
        let url = format!(
            "http://{}/api/inventory/decrease-stock?product_id={}&quantity=3",
            addr, id
        );
        let response = client.post(url).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

        let metrics = client
            .get(format!("http://{}/metrics", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(metrics.contains("insufficient_stock"));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
