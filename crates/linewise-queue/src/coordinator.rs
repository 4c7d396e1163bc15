// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue coordinator.
//!
//! Every mutation follows the same order: validate, write the store with a
//! version check, adjust the length cache, then broadcast. Store and cache
//! are written without a shared transaction; the reconciler repairs any
//! drift. Conflicts are reported to the caller and never retried here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linewise_config::model::QueueConfig;
use linewise_core::{
    EventStatus, HealthStatus, LengthCache, LinewiseError, NewQueueEntry, Page, QueueEntry,
    QueueEvent, QueueSnapshot, QueueStatus, QueueStore, RoomKey, StatusChange,
};
use linewise_hub::{Connection, HubHandle};

/// Largest page `list_for_institution` will return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Result of [`QueueCoordinator::join_queue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub entry: QueueEntry,
    /// Cached queue length after the join.
    pub length: i64,
    /// False when the client already had an active entry.
    pub created: bool,
}

/// Sole writer of queue entry state.
pub struct QueueCoordinator {
    store: Arc<dyn QueueStore>,
    cache: Arc<dyn LengthCache>,
    hub: HubHandle,
    store_timeout: Duration,
}

impl QueueCoordinator {
    pub fn new(
        store: Arc<dyn QueueStore>,
        cache: Arc<dyn LengthCache>,
        hub: HubHandle,
        config: &QueueConfig,
    ) -> Self {
        Self {
            store,
            cache,
            hub,
            store_timeout: config.store_timeout(),
        }
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Return the client's active entry for the service, creating one at the
    /// next position if there is none.
    pub async fn join_queue(
        &self,
        client_id: i64,
        institution_id: i64,
        service_id: i64,
    ) -> Result<Joined, LinewiseError> {
        self.warm(service_id).await;
        let (entry, created) = self
            .bounded(
                "join_entry",
                self.store.join_entry(&NewQueueEntry {
                    client_id,
                    institution_id,
                    service_id,
                }),
            )
            .await?;
        if !created {
            debug!(client_id, service_id, entry_id = entry.id, "client already in queue");
            return Ok(Joined {
                entry,
                length: self.get_queue_length(service_id).await,
                created,
            });
        }

        let length = match self.cache.incr(service_id).await {
            Ok(length) => length,
            Err(e) => {
                warn!(service_id, error = %e, "length cache increment failed");
                self.get_queue_length(service_id).await
            }
        };

        info!(client_id, service_id, position = entry.position, length, "client joined queue");
        Ok(Joined {
            entry,
            length,
            created: true,
        })
    }

    /// Call the waiting client with the lowest position.
    ///
    /// Broadcasts `called` to the service room and to the client's private
    /// room; only the private copy carries `message_for_client`.
    pub async fn call_next(
        &self,
        service_id: i64,
        employee_id: i64,
        message_for_client: Option<String>,
    ) -> Result<QueueEntry, LinewiseError> {
        let next = self
            .bounded("next_waiting", self.store.next_waiting(service_id))
            .await?
            .ok_or(LinewiseError::NoClientInQueue { service_id })?;
        self.warm(service_id).await;

        let called = self
            .bounded(
                "apply_status",
                self.store.apply_status(&StatusChange {
                    entry_id: next.id,
                    expected_version: next.version,
                    expected_status: next.status,
                    status: QueueStatus::Called,
                    employee_id: Some(employee_id),
                }),
            )
            .await?;
        let people_left = self.decrement(service_id).await;

        info!(
            service_id,
            employee_id,
            entry_id = called.id,
            client_id = called.client_id,
            people_left,
            "client called"
        );

        let snapshot = QueueSnapshot {
            service_id,
            people_left,
            entry: Some(called.clone()),
        };
        let service_event =
            QueueEvent::new(EventStatus::Called, RoomKey::Service(service_id), called.client_id)
                .with_snapshot(snapshot.clone());
        let client_event =
            QueueEvent::new(EventStatus::Called, RoomKey::Client(called.client_id), called.client_id)
                .with_snapshot(snapshot)
                .with_message_for_client(message_for_client);
        self.announce(RoomKey::Service(service_id), &service_event).await;
        self.announce(RoomKey::Client(called.client_id), &client_event).await;

        Ok(called)
    }

    /// Move an entry to `new_status` if `expected_version` is still current
    /// and the state machine allows it. `employee_id`, when given, is
    /// recorded on the entry.
    ///
    /// The write is conditional on the version and status that were
    /// validated, so a change committed in between fails with
    /// `ConcurrentUpdate` instead of slipping past the state machine.
    ///
    /// A terminal status is announced to the client's private room, after
    /// which the client's session for this service is evicted. Other statuses are
    /// announced to the service room and the private room.
    pub async fn update_status(
        &self,
        entry_id: i64,
        new_status: QueueStatus,
        expected_version: i64,
        employee_id: Option<i64>,
    ) -> Result<QueueEntry, LinewiseError> {
        let current = self.entry(entry_id).await?;
        if current.version != expected_version {
            return Err(LinewiseError::ConcurrentUpdate {
                id: entry_id,
                expected_version,
            });
        }
        if current.status.is_terminal() {
            return Err(LinewiseError::InvalidQueueInfo(format!(
                "queue entry {entry_id} is already {}",
                current.status
            )));
        }
        if !current.status.can_transition_to(new_status) {
            return Err(LinewiseError::InvalidQueueInfo(format!(
                "cannot move queue entry {entry_id} from {} to {new_status}",
                current.status
            )));
        }

        self.warm(current.service_id).await;
        let updated = self
            .bounded(
                "apply_status",
                self.store.apply_status(&StatusChange {
                    entry_id,
                    expected_version,
                    expected_status: current.status,
                    status: new_status,
                    employee_id,
                }),
            )
            .await?;

        let service_id = updated.service_id;
        let people_left = if current.status.is_waiting() && !new_status.is_waiting() {
            self.decrement(service_id).await
        } else {
            self.get_queue_length(service_id).await
        };

        info!(
            entry_id,
            service_id,
            from = %current.status,
            to = %new_status,
            version = updated.version,
            "queue entry status updated"
        );

        let client_id = updated.client_id;
        let snapshot = QueueSnapshot {
            service_id,
            people_left,
            entry: Some(updated.clone()),
        };
        let event_status = EventStatus::from(new_status);

        if new_status.is_terminal() {
            let event = QueueEvent::new(event_status, RoomKey::Client(client_id), client_id)
                .with_snapshot(snapshot);
            self.announce(RoomKey::Client(client_id), &event).await;
            self.evict(client_id, service_id).await;
        } else {
            for room in [RoomKey::Service(service_id), RoomKey::Client(client_id)] {
                let event = QueueEvent::new(event_status, room, client_id)
                    .with_snapshot(snapshot.clone());
                self.announce(room, &event).await;
            }
        }

        Ok(updated)
    }

    /// Cached number of waiting entries. A miss or a cache failure reads as zero.
    pub async fn get_queue_length(&self, service_id: i64) -> i64 {
        match self.cache.get(service_id).await {
            Ok(length) => length.unwrap_or(0),
            Err(e) => {
                warn!(service_id, error = %e, "length cache read failed");
                0
            }
        }
    }

    /// Fetch one entry.
    pub async fn entry(&self, entry_id: i64) -> Result<QueueEntry, LinewiseError> {
        self.bounded("get_entry", self.store.get_entry(entry_id))
            .await?
            .ok_or_else(|| LinewiseError::NotFound(format!("queue entry {entry_id}")))
    }

    /// One page (1-based) of an institution's entries.
    pub async fn list_for_institution(
        &self,
        institution_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<Page<QueueEntry>, LinewiseError> {
        if page == 0 {
            return Err(LinewiseError::InvalidQueueInfo("page starts at 1".into()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(LinewiseError::InvalidQueueInfo(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        self.bounded(
            "list_for_institution",
            self.store.list_for_institution(institution_id, page, page_size),
        )
        .await
    }

    /// Purge every entry of an institution. Returns the affected services,
    /// whose cache counters have been reconciled.
    pub async fn delete_all_for_institution(&self, institution_id: i64) -> Result<Vec<i64>, LinewiseError> {
        let services = self
            .bounded(
                "delete_for_institution",
                self.store.delete_for_institution(institution_id),
            )
            .await?;
        for &service_id in &services {
            if let Err(e) = self.reconcile(service_id).await {
                warn!(service_id, error = %e, "reconcile after purge failed");
            }
        }
        info!(institution_id, services = services.len(), "institution queue purged");
        Ok(services)
    }

    /// Purge one entry and reconcile its service's counter.
    pub async fn delete_by_id(&self, entry_id: i64) -> Result<QueueEntry, LinewiseError> {
        let removed = self
            .bounded("delete_entry", self.store.delete_entry(entry_id))
            .await?
            .ok_or_else(|| LinewiseError::NotFound(format!("queue entry {entry_id}")))?;
        if let Err(e) = self.reconcile(removed.service_id).await {
            warn!(service_id = removed.service_id, error = %e, "reconcile after delete failed");
        }
        info!(entry_id, service_id = removed.service_id, "queue entry deleted");
        Ok(removed)
    }

    /// Overwrite a service's cache counter with the store's count.
    pub async fn reconcile(&self, service_id: i64) -> Result<i64, LinewiseError> {
        self.bounded(
            "reconcile",
            linewise_cache::reconcile_service(self.store.as_ref(), self.cache.as_ref(), service_id),
        )
        .await
    }

    /// Start the periodic reconciler over every known counter.
    pub fn spawn_reconciler(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        linewise_cache::spawn_reconciler(self.store.clone(), self.cache.clone(), period, cancel)
    }

    /// Session-open use case: join (or rejoin) the queue, register the
    /// client's connection into the service room and its private room, and
    /// announce `connected` to the service room.
    pub async fn open_session(
        &self,
        client_id: i64,
        institution_id: i64,
        service_id: i64,
    ) -> Result<(Connection, Joined), LinewiseError> {
        let joined = self.join_queue(client_id, institution_id, service_id).await?;
        let connection = Connection::open(
            self.hub.clone(),
            client_id,
            RoomKey::Service(service_id),
            Some(RoomKey::Client(client_id)),
        )
        .await?;

        let event = QueueEvent::new(EventStatus::Connected, RoomKey::Service(service_id), client_id)
            .with_snapshot(QueueSnapshot {
                service_id,
                people_left: joined.length,
                entry: Some(joined.entry.clone()),
            });
        self.announce(RoomKey::Service(service_id), &event).await;
        Ok((connection, joined))
    }

    /// Register a staff member into the service room without joining.
    pub async fn watch_session(&self, staff_id: i64, service_id: i64) -> Result<Connection, LinewiseError> {
        let connection =
            Connection::open(self.hub.clone(), staff_id, RoomKey::Service(service_id), None).await?;
        debug!(staff_id, service_id, "staff watching service room");
        Ok(connection)
    }

    /// Store liveness, downgraded when the hub has stopped.
    pub async fn health(&self) -> HealthStatus {
        let store = match self.bounded("health_check", self.store.health_check()).await {
            Ok(status) => status,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        };
        match store {
            HealthStatus::Healthy if !self.hub.is_running() => {
                HealthStatus::Degraded("hub is not running".into())
            }
            other => other,
        }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, LinewiseError>>,
    ) -> Result<T, LinewiseError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.store_timeout.as_millis() as u64, "store call timed out");
                Err(LinewiseError::Timeout {
                    duration: self.store_timeout,
                })
            }
        }
    }

    /// Seed a missing counter from the store before the store changes under
    /// it, so a restarted process keeps counting from the real length.
    async fn warm(&self, service_id: i64) {
        if !matches!(self.cache.get(service_id).await, Ok(None)) {
            return;
        }
        let seeded = match self
            .bounded("count_waiting", self.store.count_waiting(service_id))
            .await
        {
            Ok(waiting) => self.cache.seed(service_id, waiting).await,
            Err(e) => Err(e),
        };
        if let Err(e) = seeded {
            warn!(service_id, error = %e, "length cache seed failed");
        }
    }

    async fn decrement(&self, service_id: i64) -> i64 {
        match self.cache.decr(service_id).await {
            Ok(length) => length,
            Err(e) => {
                warn!(service_id, error = %e, "length cache decrement failed");
                self.get_queue_length(service_id).await
            }
        }
    }

    async fn announce(&self, room: RoomKey, event: &QueueEvent) {
        if let Err(e) = self.hub.broadcast(room, event).await {
            warn!(%room, status = %event.status, error = %e, "broadcast failed");
        }
    }

    /// Evict the client's session for this service. Its private room slot
    /// goes too unless a session for another service has since taken it.
    async fn evict(&self, client_id: i64, service_id: i64) {
        let room = RoomKey::Service(service_id);
        if let Err(e) = self.hub.evict(room, client_id, RoomKey::Client(client_id)).await {
            warn!(%room, client_id, error = %e, "failed to evict client");
        }
    }
}
