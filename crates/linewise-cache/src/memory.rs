// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process length cache backed by a sharded concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;

use linewise_core::{LengthCache, LinewiseError};

/// Per-service counters in a [`DashMap`].
///
/// Each update holds the shard lock only for the read-modify-write, so
/// concurrent increments and decrements on one service never lose a step.
#[derive(Debug, Default)]
pub struct MemoryLengthCache {
    counters: DashMap<i64, i64>,
}

impl MemoryLengthCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LengthCache for MemoryLengthCache {
    async fn incr(&self, service_id: i64) -> Result<i64, LinewiseError> {
        let mut counter = self.counters.entry(service_id).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn decr(&self, service_id: i64) -> Result<i64, LinewiseError> {
        let mut counter = self.counters.entry(service_id).or_insert(0);
        *counter = (*counter - 1).max(0);
        Ok(*counter)
    }

    async fn get(&self, service_id: i64) -> Result<Option<i64>, LinewiseError> {
        Ok(self.counters.get(&service_id).map(|counter| *counter))
    }

    async fn set(&self, service_id: i64, value: i64) -> Result<(), LinewiseError> {
        self.counters.insert(service_id, value.max(0));
        Ok(())
    }

    async fn seed(&self, service_id: i64, value: i64) -> Result<i64, LinewiseError> {
        Ok(*self.counters.entry(service_id).or_insert(value.max(0)))
    }

    async fn services(&self) -> Result<Vec<i64>, LinewiseError> {
        let mut services: Vec<i64> = self.counters.iter().map(|entry| *entry.key()).collect();
        services.sort_unstable();
        Ok(services)
    }
}
