// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the store, cache, hub and coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Lifecycle state of a queue entry.
///
/// `pending` is the initial state; `completed` and `cancelled` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Called,
    InProgress,
    Completed,
    Cancelled,
}

impl QueueStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Still waiting to be called. This is what the length cache counts.
    pub fn is_waiting(self) -> bool {
        self == Self::Pending
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        matches!(
            (self, next),
            (Pending, Called)
                | (Pending, Cancelled)
                | (Called, Completed)
                | (Called, InProgress)
                | (InProgress, Completed)
        )
    }
}

/// One client's place in one service's line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: i64,
    pub client_id: i64,
    pub institution_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub position: i64,
    pub status: QueueStatus,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied by the coordinator when a client first joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueEntry {
    pub client_id: i64,
    pub institution_id: i64,
    pub service_id: i64,
}

/// A status change checked against the version and status the caller saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub entry_id: i64,
    pub expected_version: i64,
    /// The status the transition was validated from.
    pub expected_status: QueueStatus,
    pub status: QueueStatus,
    /// Attached when staff call the entry; `None` leaves the stored value untouched.
    pub employee_id: Option<i64>,
}

/// One page of a listing plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Health status reported by component health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

/// Key of a hub room.
///
/// Service rooms and private client rooms live in one registry; the typed key
/// keeps the two identifier spaces apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Service(i64),
    Client(i64),
}

impl RoomKey {
    /// The bare subject id, as carried in the wire `roomId` field.
    pub fn subject(&self) -> String {
        match self {
            Self::Service(id) | Self::Client(id) => id.to_string(),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(id) => write!(f, "svc:{id}"),
            Self::Client(id) => write!(f, "cli:{id}"),
        }
    }
}

/// Kind of account behind a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Client,
    Staff,
    Admin,
}

/// Identity resolved by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub activated: bool,
    #[serde(rename = "type")]
    pub user_type: UserType,
    /// Institution a staff or admin account belongs to.
    #[serde(default)]
    pub institution_id: Option<i64>,
}

impl AuthenticatedUser {
    /// Staff and admins may operate a service's queue.
    pub fn is_staff(&self) -> bool {
        matches!(self.user_type, UserType::Staff | UserType::Admin)
    }
}

/// A service as described by the service catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub service_id: i64,
    pub institution_id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// Current UTC time in the storage timestamp format.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
