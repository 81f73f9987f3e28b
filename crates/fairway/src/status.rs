// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fairway list`, `show`, and `cancel` command implementations.
//!
//! Read-only inspection of the request store, plus the one external-actor
//! override: cancellation.

use fairway_config::FairwayConfig;
use fairway_core::{Booking, BookingId, FairwayError};
use fairway_store::BookingStore;

fn describe(booking: &Booking) -> String {
    let mut line = format!(
        "{:>4}  {:<14}  {}  {}  {:<14}  attempts={}",
        booking.id,
        booking.requester,
        booking.requested_date,
        booking.requested_time.format("%H:%M"),
        booking.status,
        booking.attempt_count,
    );
    if let Some(slot) = booking.booked_slot {
        line.push_str(&format!("  slot={}", slot.format("%H:%M")));
    }
    line
}

/// Run the `fairway list` command.
pub async fn run_list(config: &FairwayConfig) -> Result<(), FairwayError> {
    let store = BookingStore::open(&config.storage.database_path).await?;
    let bookings = store.list().await?;

    if bookings.is_empty() {
        println!("no booking requests");
        return Ok(());
    }
    println!(
        "{:>4}  {:<14}  {:<10}  {:<5}  {:<14}",
        "id", "requester", "date", "time", "status"
    );
    for booking in &bookings {
        println!("{}", describe(booking));
    }
    Ok(())
}

/// Run the `fairway show` command.
pub async fn run_show(config: &FairwayConfig, id: i64, json: bool) -> Result<(), FairwayError> {
    let store = BookingStore::open(&config.storage.database_path).await?;
    let id = BookingId(id);
    let booking = store.get(id).await?.ok_or(FairwayError::NotFound(id.0))?;
    let history = store.history(id).await?;

    if json {
        let doc = serde_json::json!({
            "request": booking,
            "history": history,
        });
        println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        return Ok(());
    }

    println!("request {} ({})", booking.id, booking.public_id);
    println!("  requester: {}", booking.requester);
    println!(
        "  target:    {} at {}",
        booking.requested_date,
        booking.requested_time.format("%H:%M")
    );
    println!("  status:    {}", booking.status);
    println!("  eligible:  {}", booking.eligible_at);
    println!("  attempts:  {}", booking.attempt_count);
    if let Some(next) = booking.next_attempt_at {
        println!("  next try:  {next}");
    }
    if let Some(slot) = booking.booked_slot {
        println!("  booked:    {}", slot.format("%H:%M"));
    }
    if let Some(detail) = &booking.error_detail {
        println!("  last error: {detail}");
    }

    println!("history:");
    for entry in &history {
        let details = if entry.details.as_object().is_some_and(|o| o.is_empty()) {
            String::new()
        } else {
            format!("  {}", entry.details)
        };
        println!("  {}  {}{}", entry.timestamp, entry.action, details);
    }
    Ok(())
}

/// Run the `fairway cancel` command.
pub async fn run_cancel(config: &FairwayConfig, id: i64) -> Result<(), FairwayError> {
    let store = BookingStore::open(&config.storage.database_path).await?;
    let id = BookingId(id);
    match store.cancel(id).await? {
        Some(booking) => {
            println!("request {} cancelled", booking.id);
            Ok(())
        }
        None => {
            let current = store.get(id).await?.ok_or(FairwayError::NotFound(id.0))?;
            println!(
                "request {} already finished ({}); nothing to cancel",
                current.id, current.status
            );
            Ok(())
        }
    }
}
