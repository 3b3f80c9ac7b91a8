//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use std::env;
use std::time::Duration;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Stock store configuration
    pub database: DatabaseConfig,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
}

/// Stock store configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL URL; the in-memory ledger is used when absent
    pub url: Option<String>,
    /// Pool size
    pub max_connections: u32,
    /// Max wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Server-side statement timeout
    pub statement_timeout: Duration,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (in-memory ledger)
    Test,
    /// Development environment
    Development,
    /// Production environment (requires DATABASE_URL)
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api = Self::load_api_config()?;
        let database = Self::load_database_config()?;

        if environment == Environment::Production && database.url.is_none() {
            return Err(DaemonError::Config(
                "DATABASE_URL is required when STOCKD_ENV=production".to_string(),
            ));
        }

        Ok(Self {
            api,
            database,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: DatabaseConfig::default(),
            environment: Environment::Test,
        }
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("STOCKD_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid STOCKD_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_api_config() -> DaemonResult<ApiConfig> {
        let host = env::var("STOCKD_API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = Self::load_parsed_env("STOCKD_API_PORT", 8080u16)?;

        Ok(ApiConfig { host, port })
    }

    fn load_database_config() -> DaemonResult<DatabaseConfig> {
        let defaults = DatabaseConfig::default();

        let url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let max_connections =
            Self::load_parsed_env("STOCKD_DB_MAX_CONNECTIONS", defaults.max_connections)?;
        let acquire_timeout_ms = Self::load_parsed_env(
            "STOCKD_DB_ACQUIRE_TIMEOUT_MS",
            defaults.acquire_timeout.as_millis() as u64,
        )?;
        let statement_timeout_ms = Self::load_parsed_env(
            "STOCKD_DB_STATEMENT_TIMEOUT_MS",
            defaults.statement_timeout.as_millis() as u64,
        )?;

        if max_connections == 0 {
            return Err(DaemonError::Config(
                "STOCKD_DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(DatabaseConfig {
            url,
            max_connections,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
            statement_timeout: Duration::from_millis(statement_timeout_ms),
        })
    }

    fn load_parsed_env<T: std::str::FromStr>(key: &str, default: T) -> DaemonResult<T> {
        match env::var(key) {
            Ok(val) => val
                .parse::<T>()
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout: Duration::from_millis(2000),
            statement_timeout: Duration::from_millis(5000),
        }
    }
}

#[cfg(feature = "postgres")]
impl DatabaseConfig {
    /// Pool limits for `stock_db::connect`.
    pub fn pool_settings(&self) -> stock_db::PoolSettings {
        stock_db::PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
            statement_timeout: self.statement_timeout,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
