// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote collaborators reached over the network.

use async_trait::async_trait;

use crate::error::LinewiseError;
use crate::types::{AuthenticatedUser, ServiceInfo};

/// Resolves a bearer token to a user.
///
/// Implementations translate remote status codes into `Unauthenticated`,
/// `Forbidden` or `NotFound` at the call boundary.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, LinewiseError>;
}

/// Looks up services by id.
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn service(&self, service_id: i64) -> Result<ServiceInfo, LinewiseError>;
}
