// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end coordinator tests.
//!
//! `TestHarness` assembles the full queue stack against a temp SQLite
//! database and exposes the pieces for assertions.

use std::sync::Arc;
use std::time::Duration;

use linewise_cache::MemoryLengthCache;
use linewise_config::model::{HubConfig, QueueConfig, StorageConfig};
use linewise_core::{LengthCache, LinewiseError, QueueStore};
use linewise_hub::{Hub, HubHandle};
use linewise_queue::QueueCoordinator;
use linewise_storage::SqliteQueueStore;
use tokio_util::sync::CancellationToken;

use crate::session::TestSession;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    hub: HubConfig,
    queue: QueueConfig,
    store: Option<Arc<dyn QueueStore>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            hub: HubConfig::default(),
            queue: QueueConfig::default(),
            store: None,
        }
    }

    /// Capacity of every connection's outbound queue.
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.hub.outbound_capacity = capacity;
        self
    }

    /// Bound applied to each store call.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.queue.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Use a custom store instead of the temp SQLite database.
    pub fn with_store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, LinewiseError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| LinewiseError::Storage { source: e.into() })?;

        let store = match self.store {
            Some(store) => store,
            None => {
                let db_path = temp_dir.path().join("test.db");
                let sqlite = SqliteQueueStore::new(StorageConfig {
                    database_path: db_path.to_string_lossy().to_string(),
                    wal_mode: true,
                });
                sqlite.initialize().await?;
                Arc::new(sqlite)
            }
        };

        let cache = Arc::new(MemoryLengthCache::new());
        let cancel = CancellationToken::new();
        let (hub, _hub_task) = Hub::spawn(&self.hub, cancel.clone());
        let coordinator = Arc::new(QueueCoordinator::new(
            store.clone(),
            cache.clone(),
            hub.clone(),
            &self.queue,
        ));

        Ok(TestHarness {
            coordinator,
            store,
            cache,
            hub,
            cancel,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete queue stack with temp storage.
pub struct TestHarness {
    /// The coordinator under test.
    pub coordinator: Arc<QueueCoordinator>,
    /// Queue store (temp DB, cleaned up on drop).
    pub store: Arc<dyn QueueStore>,
    /// In-process length cache.
    pub cache: Arc<MemoryLengthCache>,
    /// Handle to the running hub.
    pub hub: HubHandle,
    /// Stops the hub; fired on drop.
    pub cancel: CancellationToken,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, LinewiseError> {
        Self::builder().build().await
    }

    /// Open a client session through the coordinator, as the join route does.
    pub async fn join_session(
        &self,
        client_id: i64,
        institution_id: i64,
        service_id: i64,
    ) -> Result<TestSession, LinewiseError> {
        let (connection, _joined) = self
            .coordinator
            .open_session(client_id, institution_id, service_id)
            .await?;
        Ok(TestSession::start(connection))
    }

    /// Open a staff session watching the service room.
    pub async fn watch_session(&self, staff_id: i64, service_id: i64) -> Result<TestSession, LinewiseError> {
        let connection = self.coordinator.watch_session(staff_id, service_id).await?;
        Ok(TestSession::start(connection))
    }

    /// Cached queue length, `None` on a miss.
    pub async fn cached_length(&self, service_id: i64) -> Option<i64> {
        self.cache.get(service_id).await.unwrap_or(None)
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
