// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Fairway booking engine.
//!
//! The engine only ever sees these abstract capabilities; the mechanics of
//! talking to a club website or delivering an alert live behind them.

pub mod executor;
pub mod notifier;

pub use executor::AttemptExecutor;
pub use notifier::Notifier;
