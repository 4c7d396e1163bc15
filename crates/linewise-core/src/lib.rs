// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Linewise queue service.
//!
//! Defines the queue data model, the session event wire format, the shared
//! error taxonomy, and the traits behind which the store, the length cache
//! and the remote collaborators live.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, LinewiseError};
pub use events::{EventStatus, QueueEvent, QueueSnapshot};
pub use traits::{Authenticator, LengthCache, QueueStore, ServiceCatalog};
pub use types::{
    AuthenticatedUser, HealthStatus, NewQueueEntry, Page, QueueEntry, QueueStatus, RoomKey,
    ServiceInfo, StatusChange, UserType,
};
