// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fairway book` command implementation.
//!
//! Validates and persists a new booking request. The eligibility instant is
//! computed here, once, at submission: the club opens its tee sheet
//! `lead_days` ahead of the target date, so the request becomes actionable
//! at midnight UTC that day. A target date already inside the lead window
//! gets an eligibility instant in the past and is picked up on the very
//! next scheduler tick.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use fairway_config::FairwayConfig;
use fairway_core::{FairwayError, NewBooking};
use fairway_store::BookingStore;

/// Earliest bookable time of day.
const OPENING_TIME: NaiveTime = match NaiveTime::from_hms_opt(6, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};
/// Latest bookable time of day.
const CLOSING_TIME: NaiveTime = match NaiveTime::from_hms_opt(18, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};

fn parse_date(raw: &str) -> Result<NaiveDate, FairwayError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FairwayError::Config(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

fn parse_time(raw: &str) -> Result<NaiveTime, FairwayError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| FairwayError::Config(format!("invalid time {raw:?}, expected HH:MM")))
}

/// Validate the target date and preferred time, and compute the eligibility
/// instant. `today` is passed in so the rules are testable.
fn validate_request(
    date: NaiveDate,
    time: NaiveTime,
    today: NaiveDate,
    lead_days: u64,
) -> Result<DateTime<Utc>, FairwayError> {
    if date <= today {
        return Err(FairwayError::Config(format!(
            "target date {date} is not in the future"
        )));
    }
    if !(OPENING_TIME..=CLOSING_TIME).contains(&time) {
        return Err(FairwayError::Config(format!(
            "preferred time {} is outside club hours ({}-{})",
            time.format("%H:%M"),
            OPENING_TIME.format("%H:%M"),
            CLOSING_TIME.format("%H:%M"),
        )));
    }

    let open_date = date
        .checked_sub_days(Days::new(lead_days))
        .ok_or_else(|| FairwayError::Config(format!("target date {date} is out of range")))?;
    Ok(open_date.and_time(NaiveTime::MIN).and_utc())
}

/// Run the `fairway book` command.
pub async fn run_book(
    config: &FairwayConfig,
    requester: &str,
    date: &str,
    time: &str,
) -> Result<(), FairwayError> {
    let requested_date = parse_date(date)?;
    let requested_time = parse_time(time)?;
    let eligible_at = validate_request(
        requested_date,
        requested_time,
        Utc::now().date_naive(),
        config.scheduler.lead_days,
    )?;

    let store = BookingStore::open(&config.storage.database_path).await?;
    let booking = store
        .create(NewBooking {
            requester: requester.to_string(),
            requested_date,
            requested_time,
            eligible_at,
        })
        .await?;

    println!(
        "booked request {} for {} on {} at {}",
        booking.id,
        booking.requester,
        booking.requested_date,
        booking.requested_time.format("%H:%M"),
    );
    if eligible_at <= Utc::now() {
        println!("tee sheet is already open; booking will be attempted on the next poll");
    } else {
        println!("tee sheet opens {eligible_at}; booking will be attempted then");
    }
    Ok(())
}
