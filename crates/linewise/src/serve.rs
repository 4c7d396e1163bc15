// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `linewise serve` implementation.
//!
//! Wires storage, cache, hub, coordinator and the remote collaborators into
//! the gateway and runs until a shutdown signal arrives.

use std::sync::Arc;

use tracing::{info, warn};

use linewise_cache::MemoryLengthCache;
use linewise_config::LinewiseConfig;
use linewise_core::LinewiseError;
use linewise_gateway::GatewayState;
use linewise_hub::Hub;
use linewise_queue::QueueCoordinator;
use linewise_remote::{HttpAuthenticator, HttpCatalog};
use linewise_storage::SqliteQueueStore;

use crate::shutdown;

/// Runs the `linewise serve` command.
pub async fn run_serve(config: LinewiseConfig) -> Result<(), LinewiseError> {
    init_tracing(&config.server.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting linewise");

    let cancel = shutdown::install_signal_handler();

    let store = Arc::new(SqliteQueueStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(path = %config.storage.database_path, "queue store ready");

    let cache = Arc::new(MemoryLengthCache::new());
    let (hub, hub_task) = Hub::spawn(&config.hub, cancel.child_token());
    let coordinator = Arc::new(QueueCoordinator::new(
        store.clone(),
        cache,
        hub,
        &config.queue,
    ));

    let reconciler = match config.queue.reconcile_interval() {
        Some(period) => {
            info!(period_secs = period.as_secs(), "length reconciler enabled");
            Some(coordinator.spawn_reconciler(period, cancel.child_token()))
        }
        None => {
            info!("length reconciler disabled");
            None
        }
    };

    let authenticator = Arc::new(HttpAuthenticator::new(&config.auth)?);
    let catalog = Arc::new(HttpCatalog::new(&config.catalog)?);
    let state = GatewayState::new(coordinator, authenticator, catalog);

    let served = linewise_gateway::serve(&config.server, state, cancel.clone()).await;
    if let Err(e) = &served {
        warn!(error = %e, "gateway exited with error");
    }

    // The gateway may have stopped on its own; stop everything else too.
    cancel.cancel();
    if let Err(e) = hub_task.await {
        warn!(error = %e, "hub task failed");
    }
    if let Some(reconciler) = reconciler {
        if let Err(e) = reconciler.await {
            warn!(error = %e, "reconciler task failed");
        }
    }
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to checkpoint queue store");
    }

    info!("linewise stopped");
    served
}

/// Initialize the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("linewise={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
