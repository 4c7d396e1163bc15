// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared request plumbing and status translation.

use std::time::Duration;

use linewise_core::LinewiseError;
use reqwest::StatusCode;

/// Build a client with a per-request timeout.
pub(crate) fn build_client(service: &str, timeout: Duration) -> Result<reqwest::Client, LinewiseError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LinewiseError::Remote {
            service: service.to_string(),
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Translate a transport failure.
pub(crate) fn request_error(service: &str, timeout: Duration, e: reqwest::Error) -> LinewiseError {
    if e.is_timeout() {
        return LinewiseError::Timeout { duration: timeout };
    }
    LinewiseError::Remote {
        service: service.to_string(),
        message: format!("request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Translate a non-success status code.
pub(crate) fn status_error(service: &str, status: StatusCode, body: &str) -> LinewiseError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::UNAUTHORIZED => LinewiseError::Unauthenticated(detail),
        StatusCode::FORBIDDEN => LinewiseError::Forbidden(detail),
        StatusCode::NOT_FOUND => LinewiseError::NotFound(detail),
        _ => LinewiseError::Remote {
            service: service.to_string(),
            message: detail,
            source: None,
        },
    }
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use linewise_core::ErrorKind;

    use super::*;

    #[test]
    fn status_codes_map_to_caller_errors() {
        assert_eq!(
            status_error("auth", StatusCode::UNAUTHORIZED, "").kind(),
            ErrorKind::Unauthenticated
        );
        assert_eq!(
            status_error("auth", StatusCode::FORBIDDEN, "").kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            status_error("catalog", StatusCode::NOT_FOUND, "").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            status_error("catalog", StatusCode::BAD_GATEWAY, "upstream").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://a/", "/b"), "http://a/b");
        assert_eq!(join_url("http://a", "b/c"), "http://a/b/c");
    }
}
