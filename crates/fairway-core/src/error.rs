// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fairway booking engine.

use thiserror::Error;

/// The primary error type used across all Fairway crates.
#[derive(Debug, Error)]
pub enum FairwayError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Attempt executor errors (network failure, unexpected site response).
    ///
    /// The lifecycle controller maps these to a transient attempt failure;
    /// they never escape into the scheduler loop.
    #[error("executor error: {message}")]
    Executor {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Notifier delivery errors. Best-effort: logged by the controller,
    /// never propagated into a request's state transition.
    #[error("notify error: {message}")]
    Notify {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Referenced booking request does not exist.
    #[error("booking request not found: {0}")]
    NotFound(i64),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
