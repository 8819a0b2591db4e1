use anyhow::{Context, Result};

use crate::config::Config;
use crate::db;

/// Create the supplier and proposal tables if absent. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let store = db::open_store(config).await?;

    let result = store
        .initialize_schema()
        .await
        .context("Failed to initialize database schema");

    store.close().await;
    result
}
