//! Database lifecycle management for the stock service.
//!
//! Provides pool construction, migration running and status checking.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// Result type for DB operations.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Connection pool limits.
///
/// `acquire_timeout` and `statement_timeout` bound every ledger call to
/// roughly one store round trip; a call that exceeds them fails as
/// unavailable instead of queueing indefinitely.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_millis(2000),
            statement_timeout: Duration::from_millis(5000),
        }
    }
}

/// Open a PostgreSQL pool with the given limits.
pub async fn connect(database_url: &str, settings: &PoolSettings) -> Result<PgPool> {
    let statement_timeout = settings.statement_timeout.as_millis().to_string();
    let options: PgConnectOptions = database_url.parse()?;
    let options = options.options([("statement_timeout", statement_timeout.as_str())]);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await?;

    info!(
        max_connections = settings.max_connections,
        acquire_timeout_ms = settings.acquire_timeout.as_millis() as u64,
        "Database pool ready"
    );
    Ok(pool)
}

/// Run all pending migrations.
///
/// Uses sqlx migrations from the workspace `migrations` directory.
/// Idempotent: safe to run multiple times.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    info!("Running database migrations...");

    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Migrations completed successfully");
    Ok(())
}

/// Check database connectivity and migration status.
///
/// Logs current migration version and any pending migrations.
pub async fn status(pool: &PgPool) -> Result<()> {
    // Check connectivity
    let result: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;

    if result != 1 {
        return Err(anyhow::anyhow!("Database connectivity check failed"));
    }

    info!("Database connectivity: OK");

    // Runtime query; sqlx::query! would require a database at compile time
    let rows = sqlx::query(
        r#"
        SELECT version, description, success
        FROM _sqlx_migrations
        ORDER BY version DESC
        LIMIT 10
        "#,
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(migs) if !migs.is_empty() => {
            info!("Latest migrations:");
            for mig in migs {
                let version: i64 = mig.try_get("version")?;
                let description: String = mig.try_get("description")?;
                let success: bool = mig.try_get("success")?;

                info!(
                    version,
                    %description,
                    applied = success,
                    "migration"
                );
            }
        },
        Ok(_) => {
            warn!("No migrations found in database (run `stockd db migrate` first)");
        },
        Err(e) => {
            // Table might not exist yet
            if e.to_string().contains("_sqlx_migrations") {
                warn!("Migration table not found (run `stockd db migrate` first)");
            } else {
                return Err(e.into());
            }
        },
    }

    Ok(())
}
