// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rewrites cache counters from the authoritative store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linewise_core::{LengthCache, LinewiseError, QueueStore};

/// Overwrite one service's counter with the store's waiting count.
pub async fn reconcile_service(
    store: &dyn QueueStore,
    cache: &dyn LengthCache,
    service_id: i64,
) -> Result<i64, LinewiseError> {
    let actual = store.count_waiting(service_id).await?;
    let cached = cache.get(service_id).await.unwrap_or(None);
    if cached != Some(actual) {
        debug!(service_id, ?cached, actual, "length cache drift corrected");
    }
    cache.set(service_id, actual).await?;
    Ok(actual)
}

/// Reconcile every service the cache knows about.
///
/// Returns how many counters were rewritten. A failing service is logged and
/// skipped so one bad row does not stall the rest.
pub async fn reconcile_all(store: &dyn QueueStore, cache: &dyn LengthCache) -> usize {
    let services = match cache.services().await {
        Ok(services) => services,
        Err(e) => {
            warn!(error = %e, "failed to list cached services");
            return 0;
        }
    };

    let mut rewritten = 0;
    for service_id in services {
        match reconcile_service(store, cache, service_id).await {
            Ok(_) => rewritten += 1,
            Err(e) => warn!(service_id, error = %e, "length cache reconcile failed"),
        }
    }
    rewritten
}

/// Spawn the periodic reconciler. It stops when `cancel` fires.
pub fn spawn_reconciler(
    store: Arc<dyn QueueStore>,
    cache: Arc<dyn LengthCache>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs_f64(), "length cache reconciler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("length cache reconciler cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let rewritten = reconcile_all(store.as_ref(), cache.as_ref()).await;
                    debug!(rewritten, "length cache reconciled");
                }
            }
        }
    })
}
