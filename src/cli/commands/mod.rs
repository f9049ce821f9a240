//! CLI command implementations.

pub mod config;
pub mod init;
pub mod run;
pub mod runs;
pub mod studies;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::memory::{InMemoryRunRepository, InMemoryVersionStore};
use crate::adapters::sqlite::{initialize_database, SqliteRunRepository, SqliteVersionStore};
use crate::domain::models::{Config, StorageBackend};
use crate::domain::ports::{RunRepository, VersionStore};

/// Version store and run repository selected by `storage.backend`.
pub struct Storage {
    pub store: Arc<dyn VersionStore>,
    pub runs: Arc<dyn RunRepository>,
}

pub async fn open_storage(config: &Config) -> Result<Storage> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Storage {
            store: Arc::new(InMemoryVersionStore::new()),
            runs: Arc::new(InMemoryRunRepository::new()),
        }),
        StorageBackend::Sqlite => {
            let pool = initialize_database(&config.database)
                .await
                .context("Failed to initialize database")?;
            Ok(Storage {
                store: Arc::new(SqliteVersionStore::new(pool.clone())),
                runs: Arc::new(SqliteRunRepository::new(pool)),
            })
        }
    }
}
