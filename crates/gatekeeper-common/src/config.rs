//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > gatekeeper.toml > defaults

use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized. Call gatekeeper_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let app_config = AppConfig::load()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

impl AppConfig {
    /// Build a configuration from defaults, `gatekeeper.toml` and `GATEKEEPER__*`
    /// variables without touching the global.
    pub fn load() -> Result<Self, config::ConfigError> {
        defaults()?
            // Optional config file
            .add_source(config::File::with_name("gatekeeper").required(false))
            // Environment variables (GATEKEEPER__DATABASE__URL, etc.)
            .add_source(
                config::Environment::with_prefix("GATEKEEPER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("database.url", "sqlite://gatekeeper.db?mode=rwc")?
        .set_default("database.max_connections", 5)?
        .set_default("verification.default_base_year", 2021)?
        .set_default("verification.max_rules", 100)?
        .set_default("verification.max_roles_per_rule", 10)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub verification: VerificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Base year for stored legacy rule sets that carry none.
    pub default_base_year: i32,
    /// Upper bound on rules per guild, enforced at import.
    pub max_rules: usize,
    /// Upper bound on roles granted by a single rule, enforced at import.
    pub max_roles_per_rule: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            default_base_year: 2021,
            max_rules: 100,
            max_roles_per_rule: 10,
        }
    }
}
