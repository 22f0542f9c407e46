//! # gatekeeper-db
//!
//! Storage for guild verification configuration. Each guild has at most one
//! rule set, kept as the same versioned JSON document the import/export
//! commands use. [`cache::GuildConfigCache`] fronts the table and is the
//! intended entry point.

pub mod cache;
pub mod repository;

use gatekeeper_common::config::AppConfig;
use gatekeeper_common::error::GatekeeperResult;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Shared database handle.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Connect using the configured database URL.
    pub async fn connect(config: &AppConfig) -> GatekeeperResult<Self> {
        Self::connect_url(&config.database.url, config.database.max_connections).await
    }

    pub async fn connect_url(url: &str, max_connections: u32) -> GatekeeperResult<Self> {
        tracing::info!("Connecting to SQLite...");
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!("Connected to SQLite");
        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> GatekeeperResult<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations complete");
        Ok(())
    }

    /// In-memory database with migrations applied. A single connection keeps
    /// every query on the same in-memory database.
    pub async fn in_memory() -> GatekeeperResult<Self> {
        let db = Self::connect_url("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }
}
