// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service lookups against the service catalog.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use linewise_config::model::CatalogConfig;
use linewise_core::{LinewiseError, ServiceCatalog, ServiceInfo};

use crate::http::{build_client, join_url, request_error, status_error};

const SERVICE: &str = "catalog";

/// Calls `GET {base_url}/services/{id}`.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, LinewiseError> {
        let timeout = config.timeout();
        Ok(Self {
            client: build_client(SERVICE, timeout)?,
            base_url: config.base_url.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl ServiceCatalog for HttpCatalog {
    async fn service(&self, service_id: i64) -> Result<ServiceInfo, LinewiseError> {
        let url = join_url(&self.base_url, &format!("services/{service_id}"));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(service_id, %status, "service lookup failed");
            return Err(status_error(SERVICE, status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| request_error(SERVICE, self.timeout, e))
    }
}
