// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time fan-out for the Linewise queue service.
//!
//! A single [`Hub`] task owns every [`Room`]; callers talk to it through a
//! cloneable [`HubHandle`]. Each live session is a [`Connection`] that pumps
//! inbound frames into its room and drains a bounded outbound queue back to
//! the transport.

pub mod connection;
pub mod hub;
pub mod room;

pub use connection::{Connection, Frame};
pub use hub::{Hub, HubHandle, HubStats, Member, SessionId};
pub use room::Room;
