// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Fairway booking engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides via the `FAIRWAY_` prefix.
//!
//! # Usage
//!
//! ```no_run
//! use fairway_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::FairwayConfig;
pub use validation::{validate_config, validate_for_serve, ConfigError};

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<FairwayConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError {
            field: "<config>".to_string(),
            message: err.to_string(),
        }]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<FairwayConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError {
            field: "<config>".to_string(),
            message: err.to_string(),
        }]),
    }
}

/// Render configuration errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    for err in errors {
        eprintln!("config error: {err}");
    }
}
