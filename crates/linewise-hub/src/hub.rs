// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hub actor: sole owner of the room registry.
//!
//! Membership changes and broadcasts arrive on separate bounded channels and
//! are consumed by one task in an unbiased `select!`. Every command carries a
//! oneshot acknowledgement, so a caller that registers and then broadcasts
//! knows the broadcast saw the registration. Nothing outside the task ever
//! reads or writes the room map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use uuid::Uuid;

use linewise_config::model::HubConfig;
use linewise_core::{LinewiseError, QueueEvent, RoomKey};

use crate::room::Room;

/// Identity of one live connection. A member (user) may reconnect under a
/// new session; only the current session owns the member's slot.
pub type SessionId = Uuid;

/// A registration request: put `id` into `room`, delivering through `outbox`.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub session: SessionId,
    pub room: RoomKey,
    pub outbox: broadcast::Sender<Arc<str>>,
}

/// Read-only view of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    /// Number of live rooms.
    pub rooms: usize,
    /// Members of the inspected room, or of all rooms when none was named.
    pub members: usize,
}

struct Register {
    member: Member,
    done: oneshot::Sender<()>,
}

struct Unregister {
    room: RoomKey,
    member_id: i64,
    session: Option<SessionId>,
    /// Also remove whichever session was removed from `room` from here.
    linked: Option<RoomKey>,
    done: oneshot::Sender<bool>,
}

struct Broadcast {
    room: RoomKey,
    payload: Arc<str>,
    done: oneshot::Sender<usize>,
}

struct Inspect {
    room: Option<RoomKey>,
    reply: oneshot::Sender<HubStats>,
}

/// Room map owned by the hub task.
#[derive(Default)]
struct Registry {
    rooms: HashMap<RoomKey, Room>,
}

impl Registry {
    fn register(&mut self, member: Member) {
        let room = self
            .rooms
            .entry(member.room)
            .or_insert_with(|| Room::new(member.room));
        match room.insert(member.id, member.session, member.outbox) {
            Some(previous) if previous != member.session => {
                debug!(room = %member.room, member_id = member.id, %previous, "member slot replaced by new session");
            }
            _ => trace!(room = %member.room, member_id = member.id, "member registered"),
        }
    }

    fn unregister(&mut self, room_key: RoomKey, member_id: i64, session: Option<SessionId>) -> bool {
        let Some(room) = self.rooms.get_mut(&room_key) else {
            return false;
        };
        let removed = room.remove(member_id, session);
        if removed {
            trace!(room = %room_key, member_id, "member unregistered");
        }
        if room.is_empty() {
            self.rooms.remove(&room_key);
            trace!(room = %room_key, "room removed");
        }
        removed
    }

    /// Remove a member from `room_key` and the same session from `linked`.
    ///
    /// A slot in `linked` held by another session of the member is kept.
    fn evict(&mut self, room_key: RoomKey, member_id: i64, linked: RoomKey) -> bool {
        let Some(session) = self
            .rooms
            .get(&room_key)
            .and_then(|room| room.session_of(member_id))
        else {
            return false;
        };
        let removed = self.unregister(room_key, member_id, Some(session));
        if !self.unregister(linked, member_id, Some(session)) {
            trace!(room = %linked, member_id, %session, "linked slot belongs to another session");
        }
        removed
    }

    fn broadcast(&self, room_key: RoomKey, payload: &Arc<str>) -> usize {
        match self.rooms.get(&room_key) {
            Some(room) => room.deliver(payload),
            None => 0,
        }
    }

    fn stats(&self, room: Option<RoomKey>) -> HubStats {
        let members = match room {
            Some(key) => self.rooms.get(&key).map_or(0, Room::len),
            None => self.rooms.values().map(Room::len).sum(),
        };
        HubStats {
            rooms: self.rooms.len(),
            members,
        }
    }
}

/// The hub task.
pub struct Hub {
    registry: Registry,
    register_rx: mpsc::Receiver<Register>,
    unregister_rx: mpsc::Receiver<Unregister>,
    broadcast_rx: mpsc::Receiver<Broadcast>,
    inspect_rx: mpsc::Receiver<Inspect>,
}

impl Hub {
    /// Spawn the hub task and return a handle to it.
    ///
    /// The task ends when `cancel` fires or every [`HubHandle`] is dropped.
    pub fn spawn(config: &HubConfig, cancel: CancellationToken) -> (HubHandle, JoinHandle<()>) {
        let capacity = config.command_capacity.max(1);
        let (register_tx, register_rx) = mpsc::channel(capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(capacity);
        let (inspect_tx, inspect_rx) = mpsc::channel(capacity);

        let hub = Hub {
            registry: Registry::default(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            inspect_rx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            inspect_tx,
            outbound_capacity: config.outbound_capacity.max(1),
        };
        (handle, tokio::spawn(hub.run(cancel)))
    }

    async fn run(self, cancel: CancellationToken) {
        let Hub {
            mut registry,
            mut register_rx,
            mut unregister_rx,
            mut broadcast_rx,
            mut inspect_rx,
        } = self;
        info!("hub started");

        // All senders live in HubHandle, so the channels close together.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping hub");
                    break;
                }
                cmd = register_rx.recv() => {
                    let Some(Register { member, done }) = cmd else { break };
                    registry.register(member);
                    let _ = done.send(());
                }
                cmd = unregister_rx.recv() => {
                    let Some(Unregister { room, member_id, session, linked, done }) = cmd else { break };
                    let removed = match linked {
                        Some(linked) => registry.evict(room, member_id, linked),
                        None => registry.unregister(room, member_id, session),
                    };
                    let _ = done.send(removed);
                }
                cmd = broadcast_rx.recv() => {
                    let Some(Broadcast { room, payload, done }) = cmd else { break };
                    let delivered = registry.broadcast(room, &payload);
                    trace!(%room, delivered, "broadcast");
                    let _ = done.send(delivered);
                }
                cmd = inspect_rx.recv() => {
                    let Some(Inspect { room, reply }) = cmd else { break };
                    let _ = reply.send(registry.stats(room));
                }
            }
        }

        info!(rooms = registry.rooms.len(), "hub stopped");
    }
}

/// Cloneable handle for talking to the hub task.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Register>,
    unregister_tx: mpsc::Sender<Unregister>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    inspect_tx: mpsc::Sender<Inspect>,
    outbound_capacity: usize,
}

fn hub_stopped() -> LinewiseError {
    LinewiseError::Internal("hub is not running".into())
}

impl HubHandle {
    /// A fresh bounded outbound queue. When full, the oldest message is dropped.
    pub fn outbox(&self) -> (broadcast::Sender<Arc<str>>, broadcast::Receiver<Arc<str>>) {
        broadcast::channel(self.outbound_capacity)
    }

    /// Add a member to its room, returning once the hub has applied it.
    pub async fn register(&self, member: Member) -> Result<(), LinewiseError> {
        let (done, ack) = oneshot::channel();
        self.register_tx
            .send(Register { member, done })
            .await
            .map_err(|_| hub_stopped())?;
        ack.await.map_err(|_| hub_stopped())
    }

    /// Remove a member from a room. Returns whether a slot was removed.
    ///
    /// Pass the connection's session to avoid evicting a newer session of
    /// the same member; pass `None` to evict unconditionally.
    pub async fn unregister(
        &self,
        room: RoomKey,
        member_id: i64,
        session: Option<SessionId>,
    ) -> Result<bool, LinewiseError> {
        let (done, ack) = oneshot::channel();
        self.unregister_tx
            .send(Unregister {
                room,
                member_id,
                session,
                linked: None,
                done,
            })
            .await
            .map_err(|_| hub_stopped())?;
        ack.await.map_err(|_| hub_stopped())
    }

    /// Evict whichever session of `member_id` sits in `room`, and that same
    /// session from `linked`. Returns whether a slot was removed from `room`.
    ///
    /// A member with sessions in several subject rooms shares one `linked`
    /// slot; only the evicted session gives it up.
    pub async fn evict(&self, room: RoomKey, member_id: i64, linked: RoomKey) -> Result<bool, LinewiseError> {
        let (done, ack) = oneshot::channel();
        self.unregister_tx
            .send(Unregister {
                room,
                member_id,
                session: None,
                linked: Some(linked),
                done,
            })
            .await
            .map_err(|_| hub_stopped())?;
        ack.await.map_err(|_| hub_stopped())
    }

    /// Serialize `event` once and fan it out to `room`.
    ///
    /// Returns the number of members it was queued for. A missing room is
    /// not an error.
    pub async fn broadcast(&self, room: RoomKey, event: &QueueEvent) -> Result<usize, LinewiseError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| LinewiseError::Internal(format!("failed to encode event: {e}")))?;
        self.broadcast_payload(room, Arc::from(payload)).await
    }

    /// Fan out an already encoded frame.
    pub async fn broadcast_payload(&self, room: RoomKey, payload: Arc<str>) -> Result<usize, LinewiseError> {
        let (done, ack) = oneshot::channel();
        self.broadcast_tx
            .send(Broadcast {
                room,
                payload,
                done,
            })
            .await
            .map_err(|_| hub_stopped())?;
        ack.await.map_err(|_| hub_stopped())
    }

    /// Registry statistics, optionally scoped to one room.
    pub async fn stats(&self, room: Option<RoomKey>) -> Result<HubStats, LinewiseError> {
        let (reply, response) = oneshot::channel();
        self.inspect_tx
            .send(Inspect { room, reply })
            .await
            .map_err(|_| hub_stopped())?;
        response.await.map_err(|_| hub_stopped())
    }

    /// Number of members currently in `room`.
    pub async fn room_members(&self, room: RoomKey) -> Result<usize, LinewiseError> {
        Ok(self.stats(Some(room)).await?.members)
    }

    /// False once the hub task has stopped.
    pub fn is_running(&self) -> bool {
        !self.register_tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use linewise_core::EventStatus;

    use super::*;

    fn spawn_hub() -> (HubHandle, JoinHandle<()>, CancellationToken) {
        let cancel = CancellationToken::new();
        let (handle, task) = Hub::spawn(&HubConfig::default(), cancel.clone());
        (handle, task, cancel)
    }

    fn member(
        hub: &HubHandle,
        id: i64,
        room: RoomKey,
    ) -> (Member, broadcast::Receiver<Arc<str>>) {
        let (outbox, rx) = hub.outbox();
        (
            Member {
                id,
                session: Uuid::new_v4(),
                room,
                outbox,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn broadcast_reaches_only_the_target_room() {
        let (hub, _task, _cancel) = spawn_hub();
        let (a, mut rx_a) = member(&hub, 1, RoomKey::Service(7));
        let (b, mut rx_b) = member(&hub, 2, RoomKey::Service(7));
        let (c, mut rx_c) = member(&hub, 3, RoomKey::Service(8));
        for m in [a, b, c] {
            hub.register(m).await.unwrap();
        }

        let event = QueueEvent::new(EventStatus::Called, RoomKey::Service(7), 1);
        assert_eq!(hub.broadcast(RoomKey::Service(7), &event).await.unwrap(), 2);

        let frame: QueueEvent = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        assert_eq!(frame.status, EventStatus::Called);
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn service_and_client_rooms_with_same_id_do_not_collide() {
        let (hub, _task, _cancel) = spawn_hub();
        let (svc, mut rx_svc) = member(&hub, 10, RoomKey::Service(1));
        let (cli, mut rx_cli) = member(&hub, 1, RoomKey::Client(1));
        hub.register(svc).await.unwrap();
        hub.register(cli).await.unwrap();

        hub.broadcast_payload(RoomKey::Client(1), Arc::from("private"))
            .await
            .unwrap();

        assert_eq!(&*rx_cli.try_recv().unwrap(), "private");
        assert!(rx_svc.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_to_missing_room_is_a_no_op() {
        let (hub, _task, _cancel) = spawn_hub();
        let delivered = hub
            .broadcast_payload(RoomKey::Service(99), Arc::from("{}"))
            .await
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn empty_rooms_are_removed() {
        let (hub, _task, _cancel) = spawn_hub();
        let (m, _rx) = member(&hub, 1, RoomKey::Service(7));
        let session = m.session;
        hub.register(m).await.unwrap();
        assert_eq!(hub.stats(None).await.unwrap(), HubStats { rooms: 1, members: 1 });

        assert!(hub.unregister(RoomKey::Service(7), 1, Some(session)).await.unwrap());
        assert_eq!(hub.stats(None).await.unwrap(), HubStats { rooms: 0, members: 0 });
    }

    #[tokio::test]
    async fn stale_session_does_not_evict_reconnected_member() {
        let (hub, _task, _cancel) = spawn_hub();
        let (old, _rx_old) = member(&hub, 1, RoomKey::Client(1));
        let (new, mut rx_new) = member(&hub, 1, RoomKey::Client(1));
        let old_session = old.session;
        hub.register(old).await.unwrap();
        hub.register(new).await.unwrap();

        assert!(!hub.unregister(RoomKey::Client(1), 1, Some(old_session)).await.unwrap());
        assert_eq!(hub.room_members(RoomKey::Client(1)).await.unwrap(), 1);

        hub.broadcast_payload(RoomKey::Client(1), Arc::from("still here"))
            .await
            .unwrap();
        assert_eq!(&*rx_new.try_recv().unwrap(), "still here");

        assert!(hub.unregister(RoomKey::Client(1), 1, None).await.unwrap());
    }

    #[tokio::test]
    async fn evict_spares_a_private_slot_owned_by_another_service_session() {
        let (hub, _task, _cancel) = spawn_hub();
        let (in_seven, _rx7) = member(&hub, 1, RoomKey::Service(7));
        let private_seven = Member {
            room: RoomKey::Client(1),
            ..in_seven.clone()
        };
        let (in_eight, _rx8) = member(&hub, 1, RoomKey::Service(8));
        let private_eight = Member {
            room: RoomKey::Client(1),
            ..in_eight.clone()
        };
        for m in [in_seven, private_seven, in_eight, private_eight] {
            hub.register(m).await.unwrap();
        }

        // The service 8 session now owns the private slot.
        assert!(hub.evict(RoomKey::Service(7), 1, RoomKey::Client(1)).await.unwrap());
        assert_eq!(hub.room_members(RoomKey::Service(7)).await.unwrap(), 0);
        assert_eq!(hub.room_members(RoomKey::Client(1)).await.unwrap(), 1);

        assert!(hub.evict(RoomKey::Service(8), 1, RoomKey::Client(1)).await.unwrap());
        assert_eq!(hub.stats(None).await.unwrap(), HubStats { rooms: 0, members: 0 });

        // Nothing left to evict.
        assert!(!hub.evict(RoomKey::Service(7), 1, RoomKey::Client(1)).await.unwrap());
    }

    #[tokio::test]
    async fn overflow_drops_oldest_without_blocking() {
        let (hub, _task, _cancel) = spawn_hub();
        let (m, mut rx) = member(&hub, 1, RoomKey::Service(7));
        hub.register(m).await.unwrap();

        for n in 0..15 {
            hub.broadcast_payload(RoomKey::Service(7), Arc::from(n.to_string()))
                .await
                .unwrap();
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(5))
        ));
        assert_eq!(&*rx.recv().await.unwrap(), "5");
    }

    #[tokio::test]
    async fn hub_stops_on_cancel() {
        let (hub, task, cancel) = spawn_hub();
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(!hub.is_running());
        assert!(hub.stats(None).await.is_err());
    }

    #[tokio::test]
    async fn hub_stops_when_handles_drop() {
        let (hub, task, _cancel) = spawn_hub();
        drop(hub);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
