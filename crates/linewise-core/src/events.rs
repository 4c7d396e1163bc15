// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server -> client session events.
//!
//! Every outbound WebSocket frame is one JSON-encoded [`QueueEvent`]:
//!
//! ```json
//! {"service": {"serviceId": 7, "peopleLeft": 1, "entry": {...}},
//!  "status": "called", "roomId": "1", "userId": "1",
//!  "messageForClient": "Desk 4 please"}
//! ```

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::types::{QueueEntry, QueueStatus, RoomKey};

/// Event kind carried in the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Connected,
    Received,
    Called,
    InProgress,
    Completed,
    Cancelled,
    Disconnected,
}

impl From<QueueStatus> for EventStatus {
    fn from(status: QueueStatus) -> Self {
        match status {
            // A pending entry is announced the way a fresh session is.
            QueueStatus::Pending => Self::Connected,
            QueueStatus::Called => Self::Called,
            QueueStatus::InProgress => Self::InProgress,
            QueueStatus::Completed => Self::Completed,
            QueueStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Queue state attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub service_id: i64,
    pub people_left: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<QueueEntry>,
}

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<QueueSnapshot>,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub room_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_for_client: Option<String>,
}

impl QueueEvent {
    /// A bare event addressed to `room` on behalf of `user_id`.
    pub fn new(status: EventStatus, room: RoomKey, user_id: i64) -> Self {
        Self {
            service: None,
            status,
            content: None,
            room_id: room.subject(),
            user_id: user_id.to_string(),
            message_for_client: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: QueueSnapshot) -> Self {
        self.service = Some(snapshot);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_message_for_client(mut self, message: Option<String>) -> Self {
        self.message_for_client = message;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted() {
        let event = QueueEvent::new(EventStatus::Received, RoomKey::Service(7), 1)
            .with_content("hello");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "received");
        assert_eq!(json["roomId"], "7");
        assert_eq!(json["userId"], "1");
        assert_eq!(json["content"], "hello");
        assert!(json.get("service").is_none());
        assert!(json.get("messageForClient").is_none());
    }

    #[test]
    fn called_event_carries_people_left() {
        let event = QueueEvent::new(EventStatus::Called, RoomKey::Client(1), 1)
            .with_snapshot(QueueSnapshot {
                service_id: 7,
                people_left: 1,
                entry: None,
            })
            .with_message_for_client(Some("Desk 4".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["service"]["peopleLeft"], 1);
        assert_eq!(json["service"]["serviceId"], 7);
        assert_eq!(json["messageForClient"], "Desk 4");
    }

    #[test]
    fn queue_status_maps_to_event_status() {
        assert_eq!(EventStatus::from(QueueStatus::Called), EventStatus::Called);
        assert_eq!(
            EventStatus::from(QueueStatus::InProgress).to_string(),
            "in_progress"
        );
    }
}
