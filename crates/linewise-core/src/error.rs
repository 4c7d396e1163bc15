// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Linewise queue service.

use strum::Display;
use thiserror::Error;

/// The primary error type shared by the store, cache, hub, coordinator and gateway.
///
/// The first six variants are caller errors produced locally (validation,
/// state machine, identity). The remaining variants are infrastructure
/// failures that propagate unchanged to the boundary.
#[derive(Debug, Error)]
pub enum LinewiseError {
    /// No queue entry, service, or user matched the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// A version-checked write matched zero rows because the entry moved on.
    #[error("concurrent update of queue entry {id}: version {expected_version} is stale")]
    ConcurrentUpdate { id: i64, expected_version: i64 },

    /// The requested status transition is not allowed by the state machine.
    #[error("invalid queue info: {0}")]
    InvalidQueueInfo(String),

    /// Call-next found nobody waiting.
    #[error("no client in queue for service {service_id}")]
    NoClientInQueue { service_id: i64 },

    /// Missing or rejected bearer token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but not allowed to act on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Length cache failures.
    #[error("cache error: {0}")]
    Cache(String),

    /// WebSocket or socket-level failures.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A remote collaborator (auth, catalog) failed in a way with no local equivalent.
    #[error("{service} error: {message}")]
    Remote {
        service: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by the gateway to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ConcurrentUpdate,
    InvalidQueueInfo,
    NoClientInQueue,
    Unauthenticated,
    Forbidden,
    Timeout,
    Internal,
}

impl LinewiseError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConcurrentUpdate { .. } => ErrorKind::ConcurrentUpdate,
            Self::InvalidQueueInfo(_) => ErrorKind::InvalidQueueInfo,
            Self::NoClientInQueue { .. } => ErrorKind::NoClientInQueue,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Config(_)
            | Self::Storage { .. }
            | Self::Cache(_)
            | Self::Transport { .. }
            | Self::Remote { .. }
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for errors the caller caused (4xx class).
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Timeout | ErrorKind::Internal)
    }
}
