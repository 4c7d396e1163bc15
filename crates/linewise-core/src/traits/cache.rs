// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approximate per-service queue length counter.

use async_trait::async_trait;

use crate::error::LinewiseError;

/// Fast, non-authoritative counter of waiting entries per service.
///
/// Values are hints. The queue store stays the source of truth and a
/// reconciler periodically overwrites counters with real counts.
#[async_trait]
pub trait LengthCache: Send + Sync {
    /// Increment and return the new value. A missing key starts at zero.
    async fn incr(&self, service_id: i64) -> Result<i64, LinewiseError>;

    /// Decrement and return the new value, never going below zero.
    async fn decr(&self, service_id: i64) -> Result<i64, LinewiseError>;

    /// Current value, `None` on a miss.
    async fn get(&self, service_id: i64) -> Result<Option<i64>, LinewiseError>;

    /// Overwrite the counter.
    async fn set(&self, service_id: i64, value: i64) -> Result<(), LinewiseError>;

    /// Set the counter only if it is missing, returning the value it holds
    /// afterwards. A counter created concurrently wins over `value`.
    async fn seed(&self, service_id: i64, value: i64) -> Result<i64, LinewiseError>;

    /// Every service with a counter.
    async fn services(&self) -> Result<Vec<i64>, LinewiseError>;
}
