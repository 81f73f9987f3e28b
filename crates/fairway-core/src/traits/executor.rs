// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attempt executor trait: performs one concrete booking attempt.

use async_trait::async_trait;

use crate::error::FairwayError;
use crate::types::{AttemptOutcome, AttemptRequest};

/// Performs one concrete booking attempt against the external site and
/// reports a structured outcome.
///
/// Contract:
/// - Any exclusive resource (a login session, a browser) must be released on
///   every exit path, including errors.
/// - `Err` is reserved for faults the executor could not classify; the
///   lifecycle controller maps it to a transient failure rather than letting
///   it escape into the scheduler.
/// - The controller invokes `attempt` under a timeout; implementations should
///   not install a longer one of their own.
#[async_trait]
pub trait AttemptExecutor: Send + Sync {
    async fn attempt(&self, req: &AttemptRequest) -> Result<AttemptOutcome, FairwayError>;
}
