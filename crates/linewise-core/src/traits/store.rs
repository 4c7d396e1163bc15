// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative queue store.

use async_trait::async_trait;

use crate::error::LinewiseError;
use crate::types::{HealthStatus, NewQueueEntry, Page, QueueEntry, StatusChange};

/// Persistent, ordered record of queue entries.
///
/// Implementations own position assignment and the version check. They do
/// not enforce the status state machine; the coordinator validates
/// transitions before calling [`QueueStore::apply_status`].
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// The client's non-terminal entry for the service, or a new `pending`
    /// entry at the service's next position. The flag is true when the entry
    /// was created.
    ///
    /// Lookup and insert are atomic: concurrent joins by one client yield a
    /// single entry, created exactly once.
    async fn join_entry(&self, entry: &NewQueueEntry) -> Result<(QueueEntry, bool), LinewiseError>;

    /// The waiting entry with the lowest position, if any.
    async fn next_waiting(&self, service_id: i64) -> Result<Option<QueueEntry>, LinewiseError>;

    /// Fetch one entry by id.
    async fn get_entry(&self, id: i64) -> Result<Option<QueueEntry>, LinewiseError>;

    /// Apply a status change only if the stored version and status still
    /// match the change's expectations.
    ///
    /// Fails with `NotFound` when the entry does not exist and with
    /// `ConcurrentUpdate` when the entry moved on. On success the returned
    /// entry carries `expected_version + 1`.
    async fn apply_status(&self, change: &StatusChange) -> Result<QueueEntry, LinewiseError>;

    /// Number of waiting entries for the service (the cache's ground truth).
    async fn count_waiting(&self, service_id: i64) -> Result<i64, LinewiseError>;

    /// Entries of an institution, ordered by service then position.
    async fn list_for_institution(
        &self,
        institution_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<QueueEntry>, LinewiseError>;

    /// Delete every entry of an institution. Returns the affected service ids.
    async fn delete_for_institution(&self, institution_id: i64) -> Result<Vec<i64>, LinewiseError>;

    /// Delete one entry. Returns the removed entry, or `None` if it did not exist.
    async fn delete_entry(&self, id: i64) -> Result<Option<QueueEntry>, LinewiseError>;

    /// Cheap liveness probe.
    async fn health_check(&self) -> Result<HealthStatus, LinewiseError>;
}
