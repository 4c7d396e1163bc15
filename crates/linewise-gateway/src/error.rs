// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use linewise_core::{ErrorKind, LinewiseError};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
    /// Machine-readable class, e.g. `concurrent_update`.
    pub kind: String,
}

/// A [`LinewiseError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub LinewiseError);

impl From<LinewiseError> for ApiError {
    fn from(e: LinewiseError) -> Self {
        Self(e)
    }
}

/// HTTP status for an error class.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound | ErrorKind::NoClientInQueue => StatusCode::NOT_FOUND,
        ErrorKind::ConcurrentUpdate => StatusCode::CONFLICT,
        ErrorKind::InvalidQueueInfo => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        let message = match kind {
            ErrorKind::Internal => {
                error!(error = %self.0, "request failed");
                "internal error".to_string()
            }
            _ => self.0.to_string(),
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_map_to_4xx() {
        let cases = [
            (LinewiseError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                LinewiseError::NoClientInQueue { service_id: 7 },
                StatusCode::NOT_FOUND,
            ),
            (
                LinewiseError::ConcurrentUpdate {
                    id: 1,
                    expected_version: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                LinewiseError::InvalidQueueInfo("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LinewiseError::Unauthenticated("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (LinewiseError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn infrastructure_errors_map_to_5xx() {
        let timeout = LinewiseError::Timeout {
            duration: std::time::Duration::from_secs(3),
        };
        assert_eq!(
            ApiError(timeout).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        let storage = LinewiseError::Storage {
            source: "disk full".into(),
        };
        assert_eq!(
            ApiError(storage).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
