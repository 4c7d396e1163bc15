// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue coordination for the Linewise queue service.
//!
//! [`QueueCoordinator`] is the only writer of queue entry state. It runs the
//! status state machine against the store, keeps the length cache in step,
//! and announces every change through the hub.

pub mod coordinator;

pub use coordinator::{Joined, QueueCoordinator};
