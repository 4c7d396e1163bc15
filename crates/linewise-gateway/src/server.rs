// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use linewise_config::model::ServerConfig;
use linewise_core::{Authenticator, LinewiseError, ServiceCatalog};
use linewise_queue::QueueCoordinator;

use crate::auth::{require_bearer, require_bearer_or_query};
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub coordinator: Arc<QueueCoordinator>,
    /// Resolves bearer tokens.
    pub auth: Arc<dyn Authenticator>,
    /// Resolves service ownership.
    pub catalog: Arc<dyn ServiceCatalog>,
    /// Process start time for uptime calculation.
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        coordinator: Arc<QueueCoordinator>,
        auth: Arc<dyn Authenticator>,
        catalog: Arc<dyn ServiceCatalog>,
    ) -> Self {
        Self {
            coordinator,
            auth,
            catalog,
            started_at: Instant::now(),
        }
    }
}

/// Build the gateway router:
/// - GET /health (public)
/// - /queue/* REST routes (bearer header)
/// - /queue/join and /queue/watch WebSocket routes (bearer header or `?token=`)
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/queue/call-next", post(handlers::call_next))
        .route(
            "/queue/get-all-for-inst/{inst_id}",
            get(handlers::get_all_for_inst),
        )
        .route("/queue/update-status", put(handlers::update_status))
        .route(
            "/queue/delete-all-for-inst/{inst_id}",
            delete(handlers::delete_all_for_inst),
        )
        .route("/queue/delete-by-id/{id}", delete(handlers::delete_by_id))
        .route("/queue/length/{service_id}", get(handlers::queue_length))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/queue/join/{service_id}", get(ws::join))
        .route("/queue/watch/{service_id}", get(ws::watch))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_bearer_or_query,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), LinewiseError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LinewiseError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| LinewiseError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}
