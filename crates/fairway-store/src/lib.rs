// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Fairway.
//!
//! Two tables back the whole system: `bookings`, the durable request store
//! mutated only through version-guarded compare-and-set statements, and
//! `booking_history`, the append-only record of every transition. Schema
//! lives in embedded refinery migrations and is applied on open.

mod bookings;
mod database;
mod migrations;

pub use bookings::{BookingStore, CasResult};
pub use database::Database;
