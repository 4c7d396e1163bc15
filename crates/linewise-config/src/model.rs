// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Linewise queue service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Linewise configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinewiseConfig {
    /// HTTP/WebSocket listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Queue store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Connection hub settings.
    #[serde(default)]
    pub hub: HubConfig,

    /// Queue coordinator settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Authentication collaborator.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Service-catalog collaborator.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// HTTP/WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Queue store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("linewise").join("linewise.db"))
        .unwrap_or_else(|| "linewise.db".into())
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Connection hub configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue. Overflow drops the oldest message.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    /// Capacity of each hub command channel (register, unregister, broadcast).
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
            command_capacity: default_command_capacity(),
        }
    }
}

fn default_outbound_capacity() -> usize {
    10
}

fn default_command_capacity() -> usize {
    256
}

/// Queue coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Upper bound on each store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Seconds between length-cache reconciliation passes. 0 disables the reconciler.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl QueueConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// `None` when reconciliation is disabled.
    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0)
            .then(|| Duration::from_secs(self.reconcile_interval_secs))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

fn default_store_timeout_ms() -> u64 {
    3000
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

/// Authentication collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Base URL of the authentication service.
    #[serde(default = "default_auth_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl AuthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_auth_base_url(),
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

fn default_auth_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

/// Service-catalog collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Base URL of the institution/service catalog.
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

fn default_catalog_base_url() -> String {
    "http://127.0.0.1:8082".to_string()
}

fn default_remote_timeout_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = LinewiseConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.outbound_capacity, 10);
        assert_eq!(config.queue.store_timeout(), Duration::from_secs(3));
        assert_eq!(config.auth.timeout(), Duration::from_secs(1));
        assert!(config.storage.database_path.ends_with("linewise.db"));
    }

    #[test]
    fn zero_interval_disables_reconciler() {
        let queue = QueueConfig {
            store_timeout_ms: 100,
            reconcile_interval_secs: 0,
        };
        assert!(queue.reconcile_interval().is_none());
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: LinewiseConfig = toml::from_str("[hub]\noutbound_capacity = 4\n").unwrap();
        assert_eq!(config.hub.outbound_capacity, 4);
        assert_eq!(config.hub.command_capacity, 256);
    }
}
