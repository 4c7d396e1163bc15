// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A named fan-out group. Only the hub task touches rooms.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use linewise_core::RoomKey;

use crate::hub::SessionId;

struct Slot {
    session: SessionId,
    outbox: broadcast::Sender<Arc<str>>,
}

/// Members of one room keyed by member (user) id.
pub struct Room {
    key: RoomKey,
    members: HashMap<i64, Slot>,
}

impl Room {
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            members: HashMap::new(),
        }
    }

    pub fn key(&self) -> RoomKey {
        self.key
    }

    /// Put a member in the room. An existing slot for the same member is
    /// overwritten; the session it belonged to is returned.
    pub fn insert(
        &mut self,
        member_id: i64,
        session: SessionId,
        outbox: broadcast::Sender<Arc<str>>,
    ) -> Option<SessionId> {
        self.members
            .insert(member_id, Slot { session, outbox })
            .map(|previous| previous.session)
    }

    /// Remove a member's slot.
    ///
    /// With `Some(session)` the slot is only removed while it still belongs to
    /// that session. With `None` it is removed unconditionally.
    pub fn remove(&mut self, member_id: i64, session: Option<SessionId>) -> bool {
        match (self.members.get(&member_id), session) {
            (None, _) => false,
            (Some(slot), Some(session)) if slot.session != session => false,
            (Some(_), _) => self.members.remove(&member_id).is_some(),
        }
    }

    /// Enqueue `payload` on every member's outbound queue. Never blocks; a
    /// full queue drops its oldest message. Returns how many queues took it.
    pub fn deliver(&self, payload: &Arc<str>) -> usize {
        let mut delivered = 0;
        for (member_id, slot) in &self.members {
            match slot.outbox.send(Arc::clone(payload)) {
                Ok(_) => delivered += 1,
                Err(_) => trace!(room = %self.key, member_id, "outbound queue already closed"),
            }
        }
        delivered
    }

    /// The session currently holding a member's slot.
    pub fn session_of(&self, member_id: i64) -> Option<SessionId> {
        self.members.get(&member_id).map(|slot| slot.session)
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.members.contains_key(&member_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
