// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST handlers for the queue routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use linewise_core::{AuthenticatedUser, HealthStatus, Page, QueueEntry, QueueStatus};

use crate::access::{require_can_update, require_staff_of};
use crate::error::ApiError;
use crate::server::GatewayState;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Body of `POST /queue/call-next`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallNextRequest {
    pub service_id: i64,
    #[serde(default)]
    pub message_for_client: Option<String>,
}

/// Body of `PUT /queue/update-status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub queue_id: i64,
    pub queue_status: QueueStatus,
    /// Defaults to the entry's current version.
    #[serde(default)]
    pub version: Option<i64>,
}

/// Query of `GET /queue/get-all-for-inst/{instId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueLengthResponse {
    pub service_id: i64,
    pub length: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub institution_id: i64,
    pub services: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub rooms: usize,
    pub members: usize,
}

/// POST /queue/call-next
pub async fn call_next(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CallNextRequest>,
) -> Result<Json<QueueEntry>, ApiError> {
    let service = state.catalog.service(body.service_id).await?;
    require_staff_of(&user, service.institution_id)?;
    let entry = state
        .coordinator
        .call_next(body.service_id, user.user_id, body.message_for_client)
        .await?;
    Ok(Json(entry))
}

/// GET /queue/get-all-for-inst/{instId}
pub async fn get_all_for_inst(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(institution_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<QueueEntry>>, ApiError> {
    require_staff_of(&user, institution_id)?;
    let page = state
        .coordinator
        .list_for_institution(
            institution_id,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;
    Ok(Json(page))
}

/// PUT /queue/update-status
pub async fn update_status(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<QueueEntry>, ApiError> {
    let current = state.coordinator.entry(body.queue_id).await?;
    require_can_update(&user, &current, body.queue_status)?;
    let version = body.version.unwrap_or(current.version);
    // Only staff get past the access check with `called`.
    let employee_id = (body.queue_status == QueueStatus::Called).then_some(user.user_id);
    let entry = state
        .coordinator
        .update_status(body.queue_id, body.queue_status, version, employee_id)
        .await?;
    Ok(Json(entry))
}

/// DELETE /queue/delete-all-for-inst/{instId}
pub async fn delete_all_for_inst(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(institution_id): Path<i64>,
) -> Result<Json<PurgeResponse>, ApiError> {
    require_staff_of(&user, institution_id)?;
    let services = state
        .coordinator
        .delete_all_for_institution(institution_id)
        .await?;
    Ok(Json(PurgeResponse {
        institution_id,
        services,
    }))
}

/// DELETE /queue/delete-by-id/{id}
pub async fn delete_by_id(
    State(state): State<GatewayState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(entry_id): Path<i64>,
) -> Result<Json<QueueEntry>, ApiError> {
    let current = state.coordinator.entry(entry_id).await?;
    require_staff_of(&user, current.institution_id)?;
    let removed = state.coordinator.delete_by_id(entry_id).await?;
    Ok(Json(removed))
}

/// GET /queue/length/{serviceId}
pub async fn queue_length(
    State(state): State<GatewayState>,
    Path(service_id): Path<i64>,
) -> Json<QueueLengthResponse> {
    Json(QueueLengthResponse {
        service_id,
        length: state.coordinator.get_queue_length(service_id).await,
    })
}

/// GET /health (public)
pub async fn health(State(state): State<GatewayState>) -> impl IntoResponse {
    let (status, detail, code) = match state.coordinator.health().await {
        HealthStatus::Healthy => ("healthy", None, StatusCode::OK),
        HealthStatus::Degraded(reason) => ("degraded", Some(reason), StatusCode::OK),
        HealthStatus::Unhealthy(reason) => {
            ("unhealthy", Some(reason), StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    let stats = state.coordinator.hub().stats(None).await.unwrap_or_default();
    (
        code,
        Json(HealthResponse {
            status,
            detail,
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.started_at.elapsed().as_secs(),
            rooms: stats.rooms,
            members: stats.members,
        }),
    )
}
