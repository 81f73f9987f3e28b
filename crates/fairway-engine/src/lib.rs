// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Fairway engine: scheduling, retry pacing, and slot selection.
//!
//! Three moving parts, deliberately decoupled:
//!
//! - [`Scheduler`] polls the store for due requests; it holds no in-memory
//!   timer state, so restarts are free.
//! - [`LifecycleController`] drives one request through a single
//!   claim/attempt/record cycle and owns every status transition.
//! - [`BackoffPolicy`] and [`slot::select`] are pure decision functions the
//!   controller and executors lean on.

pub mod backoff;
pub mod controller;
pub mod scheduler;
pub mod slot;

pub use backoff::BackoffPolicy;
pub use controller::{DriveOutcome, LifecycleController};
pub use scheduler::Scheduler;
