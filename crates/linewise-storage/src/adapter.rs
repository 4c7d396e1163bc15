// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the QueueStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use linewise_config::model::StorageConfig;
use linewise_core::{
    HealthStatus, LinewiseError, NewQueueEntry, Page, QueueEntry, QueueStore, StatusChange,
};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed queue store.
///
/// Wraps a [`Database`] handle and delegates to the query module. The
/// database is opened lazily by [`SqliteQueueStore::initialize`].
pub struct SqliteQueueStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteQueueStore {
    /// Create a store for the given configuration without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn with_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the configured database and run migrations.
    pub async fn initialize(&self) -> Result<(), LinewiseError> {
        let db = Database::open_with_config(&self.config).await?;
        self.db.set(db).map_err(|_| LinewiseError::Storage {
            source: "queue store already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite queue store initialized");
        Ok(())
    }

    /// Checkpoint the WAL. The connection closes when the store is dropped.
    pub async fn close(&self) -> Result<(), LinewiseError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    fn db(&self) -> Result<&Database, LinewiseError> {
        self.db.get().ok_or_else(|| LinewiseError::Storage {
            source: "queue store not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn join_entry(&self, entry: &NewQueueEntry) -> Result<(QueueEntry, bool), LinewiseError> {
        queries::queue::join_entry(self.db()?, entry).await
    }

    async fn next_waiting(&self, service_id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
        queries::queue::next_waiting(self.db()?, service_id).await
    }

    async fn get_entry(&self, id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
        queries::queue::get_entry(self.db()?, id).await
    }

    async fn apply_status(&self, change: &StatusChange) -> Result<QueueEntry, LinewiseError> {
        queries::queue::apply_status(self.db()?, change).await
    }

    async fn count_waiting(&self, service_id: i64) -> Result<i64, LinewiseError> {
        queries::queue::count_waiting(self.db()?, service_id).await
    }

    async fn list_for_institution(
        &self,
        institution_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<QueueEntry>, LinewiseError> {
        queries::queue::list_for_institution(self.db()?, institution_id, page, page_size).await
    }

    async fn delete_for_institution(&self, institution_id: i64) -> Result<Vec<i64>, LinewiseError> {
        queries::queue::delete_for_institution(self.db()?, institution_id).await
    }

    async fn delete_entry(&self, id: i64) -> Result<Option<QueueEntry>, LinewiseError> {
        queries::queue::delete_entry(self.db()?, id).await
    }

    async fn health_check(&self) -> Result<HealthStatus, LinewiseError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("queue store not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}
