// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: bind address shape, non-empty paths, non-zero capacities and
//! timeouts, and collaborator URL schemes.

use crate::diagnostic::ConfigError;
use crate::model::LinewiseConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &LinewiseConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.hub.outbound_capacity == 0 {
        fail("hub.outbound_capacity must be at least 1".to_string());
    }
    if config.hub.command_capacity == 0 {
        fail("hub.command_capacity must be at least 1".to_string());
    }

    if config.queue.store_timeout_ms == 0 {
        fail("queue.store_timeout_ms must be greater than 0".to_string());
    }

    for (key, url, timeout_ms) in [
        ("auth", &config.auth.base_url, config.auth.timeout_ms),
        ("catalog", &config.catalog.base_url, config.catalog.timeout_ms),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!(
                "{key}.base_url must start with http:// or https://, got `{url}`"
            ));
        }
        if timeout_ms == 0 {
            fail(format!("{key}.timeout_ms must be greater than 0"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
