//! Stock daemon
//!
//! Serves the inventory stock-control API for the product catalog.
//!
//! # Usage
//!
//! ```bash
//! # Start with the in-memory ledger
//! cargo run -p stockd
//!
//! # Start against PostgreSQL
//! DATABASE_URL=postgres://localhost/stock cargo run -p stockd --features postgres
//!
//! # Schema management
//! cargo run -p stockd --features postgres -- db migrate
//! cargo run -p stockd --features postgres -- db status
//! ```
//!
//! # Environment Variables
//!
//! - `STOCKD_ENV`: Environment (test, development, production)
//! - `STOCKD_API_HOST`: API host (default: 0.0.0.0)
//! - `STOCKD_API_PORT`: API port (default: 8080)
//! - `DATABASE_URL`: PostgreSQL URL (required in production)
//! - `STOCKD_DB_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `STOCKD_DB_ACQUIRE_TIMEOUT_MS`: Pool acquire timeout (default: 2000)
//! - `STOCKD_DB_STATEMENT_TIMEOUT_MS`: Statement timeout (default: 5000)

use stockd::{Config, Daemon};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("stockd=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("db") {
        return run_db(args).await;
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api.host,
        api_port = config.api.port,
        "Stock daemon"
    );

    run_daemon(config).await
}

#[cfg(feature = "postgres")]
async fn run_daemon(config: Config) -> anyhow::Result<()> {
    if config.database.url.is_some() {
        Daemon::connect(config).await?.run().await?;
        return Ok(());
    }

    warn!("DATABASE_URL not set; using the in-memory ledger (single process only)");
    Daemon::new_in_memory(config)?.run().await?;
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run_daemon(config: Config) -> anyhow::Result<()> {
    if config.database.url.is_some() {
        anyhow::bail!("DATABASE_URL is set but stockd was built without the postgres feature");
    }

    warn!("DATABASE_URL not set; using the in-memory ledger (single process only)");
    Daemon::new_in_memory(config)?.run().await?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn run_db(args: Vec<String>) -> anyhow::Result<()> {
    stockd::db::run_db_command(args).await
}

#[cfg(not(feature = "postgres"))]
async fn run_db(_args: Vec<String>) -> anyhow::Result<()> {
    anyhow::bail!("db commands require stockd built with the postgres feature")
}
