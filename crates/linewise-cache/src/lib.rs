// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approximate queue length counters for the Linewise queue service.
//!
//! The in-process [`MemoryLengthCache`] keeps one counter per service.
//! Counters are hints; the [`reconciler`] rewrites them from the queue store
//! so drift from dual writes never outlives one interval.

pub mod memory;
pub mod reconciler;

pub use memory::MemoryLengthCache;
pub use reconciler::{reconcile_all, reconcile_service, spawn_reconciler};
