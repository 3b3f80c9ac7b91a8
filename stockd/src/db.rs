//! Database CLI subcommands for stockd.
//!
//! Provides `db migrate` and `db status` commands.

use anyhow::{anyhow, Result};

use stock_db::{connect, migrate, status};

use crate::config::Config;

/// Run database CLI subcommands.
///
/// Supported commands:
/// - `stockd db migrate` - Run pending migrations
/// - `stockd db status` - Check connectivity and migration status
pub async fn run_db_command(args: Vec<String>) -> Result<()> {
    if args.len() < 3 {
        return Err(anyhow!("Usage: stockd db <migrate|status>"));
    }

    let config = Config::from_env()?;
    let database_url = config
        .database
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("DATABASE_URL environment variable is required for db commands"))?;

    let pool = connect(database_url, &config.database.pool_settings()).await?;

    match args[2].as_str() {
        "migrate" => migrate(&pool).await?,
        "status" => status(&pool).await?,
        other => {
            return Err(anyhow!("Unknown db command: {}. Use migrate or status", other));
        },
    }

    pool.close().await;
    Ok(())
}
