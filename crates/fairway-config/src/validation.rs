// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation of a loaded configuration.
//!
//! Serde catches type errors and unknown keys; this module checks the
//! semantic rules that cut across fields.

use thiserror::Error;

use crate::model::FairwayConfig;

/// A single configuration problem, keyed by the offending field.
#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a loaded configuration, collecting every problem found.
pub fn validate_config(config: &FairwayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.daemon.log_level.as_str()) {
        errors.push(ConfigError::new(
            "daemon.log_level",
            format!(
                "must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, config.daemon.log_level
            ),
        ));
    }

    if let Some(url) = &config.club.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(ConfigError::new(
                "club.base_url",
                "must start with http:// or https://",
            ));
        }
    }

    if config.scheduler.poll_interval_secs == 0 {
        errors.push(ConfigError::new(
            "scheduler.poll_interval_secs",
            "must be at least 1",
        ));
    }

    if config.scheduler.lead_days == 0 {
        errors.push(ConfigError::new("scheduler.lead_days", "must be at least 1"));
    }

    if config.scheduler.attempt_timeout_secs == 0 {
        errors.push(ConfigError::new(
            "scheduler.attempt_timeout_secs",
            "must be at least 1",
        ));
    }

    if config.retry.max_attempts == 0 {
        errors.push(ConfigError::new("retry.max_attempts", "must be at least 1"));
    }

    if config.retry.base_delay_secs == 0 {
        errors.push(ConfigError::new("retry.base_delay_secs", "must be at least 1"));
    }

    if config.retry.max_delay_secs < config.retry.base_delay_secs {
        errors.push(ConfigError::new(
            "retry.max_delay_secs",
            "must not be smaller than retry.base_delay_secs",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that the fields `serve` needs are present.
///
/// Kept separate from [`validate_config`] so read-only commands (`list`,
/// `show`) work without club credentials.
pub fn validate_for_serve(config: &FairwayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.club.base_url.is_none() {
        errors.push(ConfigError::new("club.base_url", "required for serve"));
    }
    if config.club.username.is_none() {
        errors.push(ConfigError::new("club.username", "required for serve"));
    }
    if config.club.password.is_none() {
        errors.push(ConfigError::new("club.password", "required for serve"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
