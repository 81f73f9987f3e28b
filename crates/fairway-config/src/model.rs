// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fairway booking engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Fairway configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `FAIRWAY_*`
/// environment variable overrides. All sections default to sensible values;
/// only `[club]` carries required fields (checked by validation, not serde,
/// so a config file is optional for read-only commands).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FairwayConfig {
    /// Daemon behavior settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Club website settings (login + tee sheet).
    #[serde(default)]
    pub club: ClubConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Scheduler polling and eligibility settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Retry backoff settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// E-mail notification settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Daemon behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Club website configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClubConfig {
    /// Base URL of the club's booking site. Required for `serve`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Member login name. Required for `serve`.
    #[serde(default)]
    pub username: Option<String>,

    /// Member password. Required for `serve`.
    #[serde(default)]
    pub password: Option<String>,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("fairway").join("fairway.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("fairway.db"))
        .to_string_lossy()
        .into_owned()
}

/// Scheduler polling and eligibility configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seconds between polls for due requests.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Days before the target date a request becomes eligible. The club
    /// opens its tee sheet this many days ahead.
    #[serde(default = "default_lead_days")]
    pub lead_days: u64,

    /// Wall-clock budget for a single booking attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            lead_days: default_lead_days(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_lead_days() -> u64 {
    7
}

fn default_attempt_timeout_secs() -> u64 {
    120
}

/// Retry backoff configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum number of attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in seconds. Doubles on each retry.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Upper bound on the retry delay, in seconds.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    300
}

fn default_max_delay_secs() -> u64 {
    1800
}

/// E-mail notification configuration.
///
/// All fields optional: when the SMTP settings are absent, the notifier
/// logs and skips delivery rather than failing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    /// SMTP relay hostname.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP login name.
    #[serde(default)]
    pub smtp_username: Option<String>,

    /// SMTP password.
    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Sender address.
    #[serde(default)]
    pub from_address: Option<String>,

    /// Recipient for booking outcome alerts.
    #[serde(default)]
    pub alert_address: Option<String>,
}

impl NotificationsConfig {
    /// Whether enough is configured to actually send mail.
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some() && self.alert_address.is_some()
    }
}
