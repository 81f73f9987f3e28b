// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request store: durable booking requests with compare-and-set mutations,
//! plus the append-only history log.
//!
//! Every state mutation is guarded by the row's `version` column
//! (`WHERE id = ? AND version = ?` ... `SET version = version + 1`) and is
//! applied together with its history entry in a single SQL transaction, so a
//! crash never leaves a status change unexplained in history. A mutation that
//! matches zero rows is reported as [`CasResult::Conflict`], an expected
//! no-op under contention, never an error.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use fairway_core::{
    Booking, BookingId, FairwayError, HistoryAction, HistoryEntry, NewBooking,
};
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};

const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const BOOKING_COLUMNS: &str = "id, public_id, requester, requested_date, requested_time, \
     eligible_at, status, attempt_count, next_attempt_at, last_attempt_at, booked_slot, \
     error_detail, version, created_at";

/// Result of a version-guarded mutation.
#[derive(Debug)]
pub enum CasResult {
    /// The mutation won the version race; the updated row is returned.
    Applied(Booking),
    /// Another writer mutated the row first. Expected no-op.
    Conflict,
}

impl CasResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, CasResult::Applied(_))
    }
}

fn fmt_ts(t: DateTime<Utc>) -> String {
    t.format(TS_FORMAT).to_string()
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_ts(s: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map(|n| n.and_utc())
        .map_err(|e| conversion_err(idx, e))
}

fn parse_date(s: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn parse_time(s: &str, idx: usize) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).map_err(|e| conversion_err(idx, e))
}

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    let public_id: String = row.get(1)?;
    let status: String = row.get(6)?;
    let next_attempt_at: Option<String> = row.get(8)?;
    let last_attempt_at: Option<String> = row.get(9)?;
    let booked_slot: Option<String> = row.get(10)?;

    Ok(Booking {
        id: BookingId(row.get(0)?),
        public_id: Uuid::parse_str(&public_id).map_err(|e| conversion_err(1, e))?,
        requester: row.get(2)?,
        requested_date: parse_date(&row.get::<_, String>(3)?, 3)?,
        requested_time: parse_time(&row.get::<_, String>(4)?, 4)?,
        eligible_at: parse_ts(&row.get::<_, String>(5)?, 5)?,
        status: status.parse().map_err(|e| conversion_err(6, e))?,
        attempt_count: row.get::<_, i64>(7)? as u32,
        next_attempt_at: next_attempt_at.map(|s| parse_ts(&s, 8)).transpose()?,
        last_attempt_at: last_attempt_at.map(|s| parse_ts(&s, 9)).transpose()?,
        booked_slot: booked_slot.map(|s| parse_time(&s, 10)).transpose()?,
        error_detail: row.get(11)?,
        version: row.get(12)?,
        created_at: parse_ts(&row.get::<_, String>(13)?, 13)?,
    })
}

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let action: String = row.get(2)?;
    let details: String = row.get(4)?;
    Ok(HistoryEntry {
        id: row.get(0)?,
        request_id: BookingId(row.get(1)?),
        action: action.parse().map_err(|e| conversion_err(2, e))?,
        timestamp: parse_ts(&row.get::<_, String>(3)?, 3)?,
        details: serde_json::from_str(&details).map_err(|e| conversion_err(4, e))?,
        success: row.get(5)?,
    })
}

fn fetch_booking(conn: &rusqlite::Connection, id: i64) -> rusqlite::Result<Booking> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        booking_from_row,
    )
}

fn append_history(
    conn: &rusqlite::Connection,
    request_id: i64,
    action: HistoryAction,
    timestamp: &str,
    details: serde_json::Value,
    success: Option<bool>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO booking_history (request_id, action, timestamp, details, success) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            request_id,
            action.to_string(),
            timestamp,
            details.to_string(),
            success
        ],
    )?;
    Ok(())
}

/// Durable store of booking requests and their history.
#[derive(Clone)]
pub struct BookingStore {
    conn: tokio_rusqlite::Connection,
}

impl BookingStore {
    /// Create a store over an opened [`Database`].
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection(),
        }
    }

    /// Open the database at `path` and build a store over it.
    pub async fn open(path: &str) -> Result<Self, FairwayError> {
        let db = Database::open(path).await?;
        Ok(Self::new(&db))
    }

    /// Insert a new request in `Pending` status at version 0.
    pub async fn create(&self, new: NewBooking) -> Result<Booking, FairwayError> {
        let public_id = Uuid::new_v4().to_string();
        let requested_date = new.requested_date.format(DATE_FORMAT).to_string();
        let requested_time = new.requested_time.format(TIME_FORMAT).to_string();
        let eligible_at = fmt_ts(new.eligible_at);
        let created_at = fmt_ts(Utc::now());
        let requester = new.requester;

        let booking = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO bookings (public_id, requester, requested_date, \
                     requested_time, eligible_at, status, attempt_count, version, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, 'Pending', 0, 0, ?6)",
                    params![
                        public_id,
                        requester,
                        requested_date,
                        requested_time,
                        eligible_at,
                        created_at
                    ],
                )?;
                let id = conn.last_insert_rowid();
                Ok(fetch_booking(conn, id)?)
            })
            .await
            .map_err(map_tr_err)?;

        debug!(id = %booking.id, requester = %booking.requester, "booking request created");
        Ok(booking)
    }

    /// Fetch a request by row id.
    pub async fn get(&self, id: BookingId) -> Result<Option<Booking>, FairwayError> {
        self.conn
            .call(move |conn| {
                let booking = conn
                    .query_row(
                        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                        params![id.0],
                        booking_from_row,
                    )
                    .optional()?;
                Ok(booking)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fetch a request by its public UUID.
    pub async fn get_by_public_id(&self, public_id: Uuid) -> Result<Option<Booking>, FairwayError> {
        let public_id = public_id.to_string();
        self.conn
            .call(move |conn| {
                let booking = conn
                    .query_row(
                        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE public_id = ?1"),
                        params![public_id],
                        booking_from_row,
                    )
                    .optional()?;
                Ok(booking)
            })
            .await
            .map_err(map_tr_err)
    }

    /// All requests, oldest first.
    pub async fn list(&self) -> Result<Vec<Booking>, FairwayError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY id"))?;
                let bookings = stmt
                    .query_map([], booking_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(bookings)
            })
            .await
            .map_err(map_tr_err)
    }

    /// History entries for one request, in insertion order.
    pub async fn history(&self, id: BookingId) -> Result<Vec<HistoryEntry>, FairwayError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, request_id, action, timestamp, details, success \
                     FROM booking_history WHERE request_id = ?1 ORDER BY id",
                )?;
                let entries = stmt
                    .query_map(params![id.0], history_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Ids of requests ready to run at `now`: `Pending` past their
    /// eligibility instant, plus `RetryScheduled` past their next-attempt
    /// instant. Longest-overdue first, so a backlog drains oldest work
    /// before fresh arrivals. Finite per call; carries no cross-call state.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<BookingId>, FairwayError> {
        let now_s = fmt_ts(now);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM bookings \
                     WHERE (status = 'Pending' AND eligible_at <= ?1) \
                        OR (status = 'RetryScheduled' AND next_attempt_at IS NOT NULL \
                            AND next_attempt_at <= ?1) \
                     ORDER BY COALESCE(next_attempt_at, eligible_at), id",
                )?;
                let ids = stmt
                    .query_map(params![now_s], |row| row.get::<_, i64>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(ids.into_iter().map(BookingId).collect::<Vec<_>>())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Ids of requests stranded mid-cycle by a worker that died: `Attempting`
    /// rows whose attempt started at or before `cutoff`, and `Claimed` rows
    /// whose claim was recorded at or before `cutoff`. Such rows are invisible
    /// to [`due`](Self::due) and stay orphaned until someone re-arms them.
    pub async fn stale_in_flight(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookingId>, FairwayError> {
        let cutoff_s = fmt_ts(cutoff);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id FROM bookings \
                     WHERE (status = 'Attempting' AND last_attempt_at <= ?1) \
                        OR (status = 'Claimed' AND COALESCE( \
                              (SELECT MAX(timestamp) FROM booking_history \
                               WHERE request_id = bookings.id AND action = 'Claimed'), \
                              created_at) <= ?1) \
                     ORDER BY id",
                )?;
                let ids = stmt
                    .query_map(params![cutoff_s], |row| row.get::<_, i64>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(ids.into_iter().map(BookingId).collect::<Vec<_>>())
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Pending|RetryScheduled -> Claimed`. The exclusivity gate: of N
    /// concurrent claimants on the same version, exactly one applies.
    pub async fn claim(&self, id: BookingId, version: i64) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(Utc::now());
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'Claimed', version = version + 1 \
                     WHERE id = ?1 AND version = ?2 \
                       AND status IN ('Pending', 'RetryScheduled')",
                    params![id.0, version],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::Claimed,
                    &now_s,
                    serde_json::json!({}),
                    None,
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Claimed -> RetryScheduled` with an immediate next-attempt instant.
    ///
    /// Returns an orphaned claim to the dispatchable pool. The interrupted
    /// cycle never reached `Attempting`, so `attempt_count` stays untouched.
    /// Appends `RetryArmed`.
    pub async fn release_claim(
        &self,
        id: BookingId,
        version: i64,
        now: DateTime<Utc>,
    ) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(now);
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'RetryScheduled', next_attempt_at = ?3, \
                     version = version + 1 \
                     WHERE id = ?1 AND version = ?2 AND status = 'Claimed'",
                    params![id.0, version, now_s],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::RetryArmed,
                    &now_s,
                    serde_json::json!({ "delay_secs": 0, "next_attempt_at": now_s }),
                    None,
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Claimed -> Attempting`; increments `attempt_count` and stamps
    /// `last_attempt_at`. Appends `AttemptStarted`.
    pub async fn begin_attempt(
        &self,
        id: BookingId,
        version: i64,
        now: DateTime<Utc>,
    ) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(now);
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'Attempting', \
                     attempt_count = attempt_count + 1, last_attempt_at = ?3, \
                     version = version + 1 \
                     WHERE id = ?1 AND version = ?2 AND status = 'Claimed'",
                    params![id.0, version, now_s],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                let booking = fetch_booking(&tx, id.0)?;
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::AttemptStarted,
                    &now_s,
                    serde_json::json!({ "attempt": booking.attempt_count }),
                    None,
                )?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Attempting -> Succeeded`; records the secured slot. Appends
    /// `AttemptSucceeded` with the candidate set observed.
    pub async fn complete(
        &self,
        id: BookingId,
        version: i64,
        booked_slot: NaiveTime,
        candidates: &[NaiveTime],
    ) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(Utc::now());
        let slot_s = booked_slot.format(TIME_FORMAT).to_string();
        let candidates_s: Vec<String> = candidates
            .iter()
            .map(|c| c.format(TIME_FORMAT).to_string())
            .collect();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'Succeeded', booked_slot = ?3, \
                     error_detail = NULL, next_attempt_at = NULL, version = version + 1 \
                     WHERE id = ?1 AND version = ?2 AND status = 'Attempting'",
                    params![id.0, version, slot_s],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::AttemptSucceeded,
                    &now_s,
                    serde_json::json!({ "booked_slot": slot_s, "candidates": candidates_s }),
                    Some(true),
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Attempting -> RetryScheduled` with the next-attempt instant.
    /// Appends `AttemptFailed` then `RetryArmed` in the same transaction.
    pub async fn schedule_retry(
        &self,
        id: BookingId,
        version: i64,
        next_attempt_at: DateTime<Utc>,
        delay_secs: u64,
        reason: &str,
    ) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(Utc::now());
        let next_s = fmt_ts(next_attempt_at);
        let reason = reason.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'RetryScheduled', next_attempt_at = ?3, \
                     error_detail = ?4, version = version + 1 \
                     WHERE id = ?1 AND version = ?2 AND status = 'Attempting'",
                    params![id.0, version, next_s, reason],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::AttemptFailed,
                    &now_s,
                    serde_json::json!({ "error": reason }),
                    Some(false),
                )?;
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::RetryArmed,
                    &now_s,
                    serde_json::json!({ "delay_secs": delay_secs, "next_attempt_at": next_s }),
                    None,
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// `Attempting -> Failed` (terminal). Appends `AttemptFailed` then
    /// `GivenUp` in the same transaction.
    pub async fn give_up(
        &self,
        id: BookingId,
        version: i64,
        reason: &str,
    ) -> Result<CasResult, FairwayError> {
        let now_s = fmt_ts(Utc::now());
        let reason = reason.to_string();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'Failed', error_detail = ?3, \
                     next_attempt_at = NULL, version = version + 1 \
                     WHERE id = ?1 AND version = ?2 AND status = 'Attempting'",
                    params![id.0, version, reason],
                )?;
                if changed == 0 {
                    return Ok(CasResult::Conflict);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::AttemptFailed,
                    &now_s,
                    serde_json::json!({ "error": reason }),
                    Some(false),
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::GivenUp,
                    &now_s,
                    serde_json::json!({ "error": reason, "attempts": booking.attempt_count }),
                    None,
                )?;
                tx.commit()?;
                Ok(CasResult::Applied(booking))
            })
            .await
            .map_err(map_tr_err)
    }

    /// External-actor override: any non-terminal status -> `Cancelled`.
    ///
    /// Not gated on a caller version, but still bumps `version`, so an
    /// in-flight drive observes a conflict on its next step and aborts as
    /// superseded. Returns the updated row, or `None` if the request was
    /// already terminal (or missing).
    pub async fn cancel(&self, id: BookingId) -> Result<Option<Booking>, FairwayError> {
        let now_s = fmt_ts(Utc::now());
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE bookings SET status = 'Cancelled', version = version + 1 \
                     WHERE id = ?1 AND status IN \
                       ('Pending', 'Claimed', 'Attempting', 'RetryScheduled')",
                    params![id.0],
                )?;
                if changed == 0 {
                    return Ok(None);
                }
                append_history(
                    &tx,
                    id.0,
                    HistoryAction::Cancelled,
                    &now_s,
                    serde_json::json!({}),
                    None,
                )?;
                let booking = fetch_booking(&tx, id.0)?;
                tx.commit()?;
                Ok(Some(booking))
            })
            .await
            .map_err(map_tr_err)
    }
}
