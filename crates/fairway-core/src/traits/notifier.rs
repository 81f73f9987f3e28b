// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait: informed on terminal booking outcomes.

use async_trait::async_trait;

use crate::error::FairwayError;
use crate::types::Notification;

/// Delivers a notification about a terminal booking outcome.
///
/// Fire-and-forget from the lifecycle controller's perspective: a delivery
/// failure is logged and never rolls back or blocks the request's own
/// terminal state transition.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), FairwayError>;
}
