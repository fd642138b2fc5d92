//! CLI command implementations.

pub mod init;
pub mod levels;
pub mod play;
pub mod progress;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_database, SqliteProgressStore};
use crate::domain::models::{Config, TaskCatalog};
use crate::domain::ports::ProgressStore;

/// Open the progress database, creating and migrating it when needed.
pub(crate) async fn open_progress_store(config: &Config) -> Result<Arc<dyn ProgressStore>> {
    let pool = initialize_database(&config.database)
        .await
        .with_context(|| format!("Failed to open progress database at {}", config.database.path))?;
    Ok(Arc::new(SqliteProgressStore::new(pool)))
}

pub(crate) fn load_catalog(config: &Config) -> Result<Arc<TaskCatalog>> {
    let catalog = TaskCatalog::load(&config.catalog.path)
        .with_context(|| format!("Failed to load task catalog from {}", config.catalog.path))?;
    Ok(Arc::new(catalog))
}
