// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token resolution against the authentication service.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use linewise_config::model::AuthConfig;
use linewise_core::{AuthenticatedUser, Authenticator, LinewiseError};

use crate::http::{build_client, join_url, request_error, status_error};

const SERVICE: &str = "auth";

/// Calls `GET {base_url}/auth/authenticate` with the caller's bearer token.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpAuthenticator {
    pub fn new(config: &AuthConfig) -> Result<Self, LinewiseError> {
        let timeout = config.timeout();
        Ok(Self {
            client: build_client(SERVICE, timeout)?,
            url: join_url(&config.base_url, "auth/authenticate"),
            timeout,
        })
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, LinewiseError> {
        if token.is_empty() {
            return Err(LinewiseError::Unauthenticated("missing bearer token".into()));
        }

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "authentication rejected");
            return Err(status_error(SERVICE, status, &body));
        }

        let user: AuthenticatedUser = response
            .json()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;
        if !user.activated {
            return Err(LinewiseError::Forbidden(format!(
                "user {} is not activated",
                user.user_id
            )));
        }
        debug!(user_id = user.user_id, user_type = %user.user_type, "token authenticated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linewise_core::UserType;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authenticator(base_url: &str, timeout_ms: u64) -> HttpAuthenticator {
        HttpAuthenticator::new(&AuthConfig {
            base_url: base_url.to_string(),
            timeout_ms,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/authenticate"))
            .and(header("authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "userId": 50,
                "activated": true,
                "type": "staff",
                "institutionId": 3
            })))
            .mount(&server)
            .await;

        let user = authenticator(&server.uri(), 1000)
            .authenticate("good")
            .await
            .unwrap();
        assert_eq!(user.user_id, 50);
        assert_eq!(user.user_type, UserType::Staff);
        assert_eq!(user.institution_id, Some(3));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/authenticate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = authenticator(&server.uri(), 1000)
            .authenticate("bad")
            .await
            .unwrap_err();
        assert!(matches!(err, LinewiseError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn deactivated_user_is_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "userId": 1,
                "activated": false,
                "type": "client"
            })))
            .mount(&server)
            .await;

        let err = authenticator(&server.uri(), 1000)
            .authenticate("t")
            .await
            .unwrap_err();
        assert!(matches!(err, LinewiseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn server_error_is_internal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = authenticator(&server.uri(), 1000)
            .authenticate("t")
            .await
            .unwrap_err();
        assert!(matches!(err, LinewiseError::Remote { .. }));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = authenticator(&server.uri(), 50)
            .authenticate("t")
            .await
            .unwrap_err();
        assert!(matches!(err, LinewiseError::Timeout { .. }));
    }

    #[tokio::test]
    async fn empty_token_is_rejected_locally() {
        let err = authenticator("http://127.0.0.1:9", 1000)
            .authenticate("")
            .await
            .unwrap_err();
        assert!(matches!(err, LinewiseError::Unauthenticated(_)));
    }
}
