// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator doubles with fixed answers.

use std::collections::HashMap;

use async_trait::async_trait;

use linewise_core::{
    AuthenticatedUser, Authenticator, LinewiseError, ServiceCatalog, ServiceInfo, UserType,
};

/// Authenticator backed by a token table.
///
/// Unknown tokens are `Unauthenticated`; deactivated users are `Forbidden`,
/// matching the HTTP collaborator.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary user under `token`.
    pub fn with_user(mut self, token: &str, user: AuthenticatedUser) -> Self {
        self.users.insert(token.to_string(), user);
        self
    }

    /// An activated client account.
    pub fn with_client(self, token: &str, user_id: i64) -> Self {
        self.with_user(
            token,
            AuthenticatedUser {
                user_id,
                activated: true,
                user_type: UserType::Client,
                institution_id: None,
            },
        )
    }

    /// An activated staff account of `institution_id`.
    pub fn with_staff(self, token: &str, user_id: i64, institution_id: i64) -> Self {
        self.with_user(
            token,
            AuthenticatedUser {
                user_id,
                activated: true,
                user_type: UserType::Staff,
                institution_id: Some(institution_id),
            },
        )
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, LinewiseError> {
        let user = self
            .users
            .get(token)
            .cloned()
            .ok_or_else(|| LinewiseError::Unauthenticated("unknown token".into()))?;
        if !user.activated {
            return Err(LinewiseError::Forbidden(format!(
                "user {} is not activated",
                user.user_id
            )));
        }
        Ok(user)
    }
}

/// Service catalog backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    services: HashMap<i64, ServiceInfo>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service_id: i64, institution_id: i64) -> Self {
        self.services.insert(
            service_id,
            ServiceInfo {
                service_id,
                institution_id,
                name: None,
            },
        );
        self
    }
}

#[async_trait]
impl ServiceCatalog for StaticCatalog {
    async fn service(&self, service_id: i64) -> Result<ServiceInfo, LinewiseError> {
        self.services
            .get(&service_id)
            .cloned()
            .ok_or_else(|| LinewiseError::NotFound(format!("service {service_id}")))
    }
}
