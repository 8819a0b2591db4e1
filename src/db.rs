//! Database connection management.
//!
//! Builds the configured [`Store`] backend with its connection pool. The
//! pool is created once at startup and shared by every request; it is
//! released through [`Store::close`] at shutdown.
//!
//! # Backends
//!
//! | `datastore.kind` | Store | Pool |
//! |------------------|-------|------|
//! | `postgres` | [`PgStore`] | `sqlx::PgPool` |
//! | `sqlite` | [`SqliteStore`] | `sqlx::SqlitePool` (WAL mode) |

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

use rfp_intake_core::store::Store;

use crate::config::{Config, DatastoreConfig, PostgresConfig, SqliteConfig};
use crate::pg_store::PgStore;
use crate::sqlite_store::SqliteStore;

/// Open the configured store.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match &config.datastore {
        DatastoreConfig::Postgres(pg) => Arc::new(PgStore::new(connect_postgres(pg).await?)),
        DatastoreConfig::Sqlite(sqlite) => {
            Arc::new(SqliteStore::new(connect_sqlite(sqlite).await?))
        }
    };
    Ok(store)
}

/// Create a PostgreSQL pool from discrete connection parameters.
pub async fn connect_postgres(config: &PostgresConfig) -> Result<PgPool> {
    let options = PgConnectOptions::new()
        .host(&config.host.to_string())
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to postgres at {}:{}/{}",
                config.host, config.port, config.database
            )
        })?;

    Ok(pool)
}

/// Create a SQLite pool, creating the file and parent directories if needed.
pub async fn connect_sqlite(config: &SqliteConfig) -> Result<SqlitePool> {
    let db_path = &config.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open sqlite database: {}", db_path.display()))?;

    Ok(pool)
}
