// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fairway booking engine.
//!
//! This crate provides the foundational types, error type, and collaborator
//! traits used throughout the Fairway workspace: the booking request record
//! and its lifecycle state machine, the append-only history entry, and the
//! `AttemptExecutor` / `Notifier` seams behind which the external world lives.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FairwayError;
pub use traits::{AttemptExecutor, Notifier};
pub use types::{
    AttemptOutcome, AttemptRequest, Booking, BookingId, BookingStatus, HistoryAction,
    HistoryEntry, NewBooking, Notification, NotificationKind,
};
