// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types for booking requests, their lifecycle, and attempt outcomes.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Row identifier of a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub i64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle status of a booking request.
///
/// Transitions are monotone: `Pending -> Claimed -> Attempting`, then either
/// `Succeeded` (terminal), `Failed` (terminal), or `RetryScheduled` which
/// loops back through `Claimed`. `Cancelled` is a terminal override reachable
/// from any non-terminal status. A request never returns to `Pending`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum BookingStatus {
    Pending,
    Claimed,
    Attempting,
    Succeeded,
    RetryScheduled,
    Failed,
    Cancelled,
}

impl BookingStatus {
    /// Whether no further transition can occur from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Succeeded | BookingStatus::Failed | BookingStatus::Cancelled
        )
    }

    /// Whether a worker may claim a request in this status for execution.
    pub fn is_claimable(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::RetryScheduled)
    }
}

/// Semantic tag for an append-only history entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum HistoryAction {
    Claimed,
    AttemptStarted,
    AttemptSucceeded,
    AttemptFailed,
    RetryArmed,
    GivenUp,
    Cancelled,
}

/// A user-submitted booking request and its current lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Row identifier, assigned at creation.
    pub id: BookingId,
    /// Stable public identifier (UUID v4), assigned at creation.
    pub public_id: Uuid,
    /// Opaque requester label.
    pub requester: String,
    /// Target calendar date of the booking.
    pub requested_date: NaiveDate,
    /// Preferred time of day on the target date.
    pub requested_time: NaiveTime,
    /// Instant the request first becomes actionable (fixed offset before the
    /// target date, computed at creation).
    pub eligible_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// Number of executed attempts so far.
    pub attempt_count: u32,
    /// When the next retry becomes actionable; set while `RetryScheduled`.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Instant of the most recent attempt, if any.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Time of day actually secured; set only on success.
    pub booked_slot: Option<NaiveTime>,
    /// Last failure description, if any.
    pub error_detail: Option<String>,
    /// Optimistic-concurrency version; every mutation bumps it by one.
    pub version: i64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Fields required to create a new booking request.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub requester: String,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub eligible_at: DateTime<Utc>,
}

/// One immutable history entry for a booking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub request_id: BookingId,
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    /// Free-form structured payload (candidate slots, chosen slot, error text).
    pub details: serde_json::Value,
    /// Outcome flag; `None` for entries that do not denote an attempt outcome.
    pub success: Option<bool>,
}

/// Structured result of one attempt by an [`crate::AttemptExecutor`].
///
/// A closed tagged variant: the lifecycle controller dispatches on these
/// tags and never inspects error strings.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// A slot was secured. `candidates` records every open slot observed,
    /// for the audit history.
    Success {
        booked_slot: NaiveTime,
        candidates: Vec<NaiveTime>,
    },
    /// Retry-eligible failure (network error, site unavailable, no open
    /// slots yet).
    TransientFailure { reason: String },
    /// Not worth retrying (invalid credentials, malformed request).
    /// Short-circuits to `Failed` regardless of remaining attempt budget.
    PermanentFailure { reason: String },
    /// The attempt exceeded its wall-clock budget. Treated as transient.
    Timeout,
}

/// Everything an executor needs to perform one attempt.
#[derive(Debug, Clone)]
pub struct AttemptRequest {
    pub request_id: BookingId,
    pub public_id: Uuid,
    pub requester: String,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    /// 1-based number of this attempt.
    pub attempt_number: u32,
}

/// Terminal outcome kind carried by a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    Success { booked_slot: NaiveTime },
    Failure { reason: String },
}

/// Payload handed to a [`crate::Notifier`] on a terminal transition.
#[derive(Debug, Clone)]
pub struct Notification {
    pub public_id: Uuid,
    pub requester: String,
    pub requested_date: NaiveDate,
    pub requested_time: NaiveTime,
    pub attempt_count: u32,
    pub kind: NotificationKind,
}
