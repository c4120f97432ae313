//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::AppResult;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key shared with the identity provider.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Ledger behaviour settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Fixed two-digit prefix of every account number.
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,
    /// Bound on account-number generation attempts during provisioning.
    #[serde(default = "default_provisioning_attempts")]
    pub provisioning_attempts: u32,
    /// Number of audit entries and flags returned by the overview.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u64,
    /// Pool total used when the pool row is first created.
    #[serde(default)]
    pub initial_pool_total: Decimal,
    /// Reserve used when the pool row is first created.
    #[serde(default)]
    pub initial_reserve: Decimal,
}

fn default_account_prefix() -> String {
    "77".to_string()
}

fn default_provisioning_attempts() -> u32 {
    3
}

fn default_recent_limit() -> u64 {
    30
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            account_prefix: default_account_prefix(),
            provisioning_attempts: default_provisioning_attempts(),
            recent_limit: default_recent_limit(),
            initial_pool_total: Decimal::ZERO,
            initial_reserve: Decimal::ZERO,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("POOLBANK").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
