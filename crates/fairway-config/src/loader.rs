// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./fairway.toml` > `~/.config/fairway/fairway.toml`
//! > `/etc/fairway/fairway.toml` with environment variable overrides via
//! the `FAIRWAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FairwayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/fairway/fairway.toml` (system-wide)
/// 3. `~/.config/fairway/fairway.toml` (user XDG config)
/// 4. `./fairway.toml` (local directory)
/// 5. `FAIRWAY_*` environment variables
pub fn load_config() -> Result<FairwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FairwayConfig::default()))
        .merge(Toml::file("/etc/fairway/fairway.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("fairway/fairway.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("fairway.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FairwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FairwayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FairwayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FairwayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `FAIRWAY_CLUB_BASE_URL` must map to
/// `club.base_url`, not `club.base.url`.
fn env_provider() -> Env {
    Env::prefixed("FAIRWAY_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: FAIRWAY_CLUB_BASE_URL -> "club_base_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("daemon_", "daemon.", 1)
            .replacen("club_", "club.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("retry_", "retry.", 1)
            .replacen("notifications_", "notifications.", 1);
        mapped.into()
    })
}
