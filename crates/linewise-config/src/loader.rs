// SPDX-FileCopyrightText: 2026 Linewise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./linewise.toml` > `~/.config/linewise/linewise.toml` >
//! `/etc/linewise/linewise.toml` with environment variable overrides via `LINEWISE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LinewiseConfig;

/// Top-level sections, used to turn `LINEWISE_HUB_OUTBOUND_CAPACITY` into `hub.outbound_capacity`.
const SECTIONS: &[&str] = &["server", "storage", "hub", "queue", "auth", "catalog"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/linewise/linewise.toml` (system-wide)
/// 3. `~/.config/linewise/linewise.toml` (user XDG config)
/// 4. `./linewise.toml` (local directory)
/// 5. `LINEWISE_*` environment variables
pub fn load_config() -> Result<LinewiseConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<LinewiseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LinewiseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LinewiseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LinewiseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LinewiseConfig::default()))
        .merge(Toml::file("/etc/linewise/linewise.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("linewise/linewise.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("linewise.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first underscore after a section name to a dot.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that field names with
/// underscores survive: `LINEWISE_QUEUE_STORE_TIMEOUT_MS` maps to
/// `queue.store_timeout_ms`, not `queue.store.timeout.ms`.
fn env_provider() -> Env {
    Env::prefixed("LINEWISE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("server_port"), "server.port");
        assert_eq!(
            map_env_key("queue_store_timeout_ms"),
            "queue.store_timeout_ms"
        );
        assert_eq!(map_env_key("auth_base_url"), "auth.base_url");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }

    #[test]
    fn inline_toml_overrides_defaults() {
        let config = load_config_from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
