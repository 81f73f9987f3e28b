// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle controller: drives one due request through a single
//! claim/attempt/record cycle.
//!
//! The controller owns every status transition after creation. Executors
//! only report an [`AttemptOutcome`]; whether that outcome means retry,
//! success, or giving up is decided here, by tag, never by inspecting
//! failure strings. Any step losing its version race aborts the cycle
//! quietly; whoever won the race is responsible for the request now.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use fairway_core::{
    AttemptExecutor, AttemptOutcome, AttemptRequest, Booking, BookingId, BookingStatus,
    FairwayError, Notification, NotificationKind, Notifier,
};
use fairway_store::{BookingStore, CasResult};
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;

/// A claim or attempt older than this many attempt timeouts belongs to a
/// worker that died mid-cycle; a live one would have written its outcome by
/// then.
const STALE_AFTER_TIMEOUTS: u32 = 2;

/// What a single drive cycle did. Losing a race is an outcome here, not an
/// error; whoever won the race owns the request now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The attempt succeeded and the booking is recorded.
    Completed,
    /// The attempt failed and a retry was armed.
    RetryArmed,
    /// The attempt budget is spent (or the failure was permanent).
    GaveUp,
    /// Another worker claimed the request first.
    AlreadyClaimed,
    /// The request stopped being ours mid-cycle (cancelled, finished, or
    /// mutated by someone else).
    Superseded,
}

pub struct LifecycleController {
    store: BookingStore,
    executor: Arc<dyn AttemptExecutor>,
    notifier: Arc<dyn Notifier>,
    backoff: BackoffPolicy,
    attempt_timeout: Duration,
}

impl LifecycleController {
    pub fn new(
        store: BookingStore,
        executor: Arc<dyn AttemptExecutor>,
        notifier: Arc<dyn Notifier>,
        backoff: BackoffPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            executor,
            notifier,
            backoff,
            attempt_timeout,
        }
    }

    /// Run one full cycle for `id`: claim, attempt, record the outcome.
    ///
    /// Safe to call for a request that is no longer actionable; stale or
    /// contended requests are skipped without error.
    pub async fn drive(&self, id: BookingId) -> Result<DriveOutcome, FairwayError> {
        let Some(booking) = self.store.get(id).await? else {
            debug!(%id, "request vanished before claim, skipping");
            return Ok(DriveOutcome::Superseded);
        };
        if !booking.status.is_claimable() {
            debug!(%id, status = %booking.status, "request not claimable, skipping");
            return Ok(DriveOutcome::Superseded);
        }

        let claimed = match self.store.claim(id, booking.version).await? {
            CasResult::Applied(b) => b,
            CasResult::Conflict => {
                debug!(%id, "lost claim race, skipping");
                return Ok(DriveOutcome::AlreadyClaimed);
            }
        };

        let attempting = match self
            .store
            .begin_attempt(id, claimed.version, Utc::now())
            .await?
        {
            CasResult::Applied(b) => b,
            CasResult::Conflict => {
                debug!(%id, "superseded before attempt start, skipping");
                return Ok(DriveOutcome::Superseded);
            }
        };

        let request = AttemptRequest {
            request_id: attempting.id,
            public_id: attempting.public_id,
            requester: attempting.requester.clone(),
            requested_date: attempting.requested_date,
            requested_time: attempting.requested_time,
            attempt_number: attempting.attempt_count,
        };

        info!(
            %id,
            attempt = attempting.attempt_count,
            date = %attempting.requested_date,
            "starting booking attempt"
        );

        let outcome =
            match tokio::time::timeout(self.attempt_timeout, self.executor.attempt(&request)).await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    // Executor errors are indistinguishable from transient
                    // environmental failures; treat them as such.
                    warn!(%id, error = %e, "executor returned an error");
                    AttemptOutcome::TransientFailure {
                        reason: e.to_string(),
                    }
                }
                Err(_) => AttemptOutcome::Timeout,
            };

        self.record_outcome(&attempting, outcome).await
    }

    /// Instant before which an in-flight claim or attempt is considered
    /// abandoned by its worker.
    pub fn stale_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let grace = self.attempt_timeout.as_secs() * u64::from(STALE_AFTER_TIMEOUTS);
        now - TimeDelta::seconds(grace as i64)
    }

    /// Re-arm a request stranded at `Claimed` or `Attempting` by a worker
    /// that died mid-cycle.
    ///
    /// An orphaned claim goes straight back to the dispatchable pool; an
    /// orphaned attempt is treated as a transient failure of that attempt,
    /// subject to the usual retry budget. Races with a worker that turns out
    /// to still be alive are resolved by version conflict, as everywhere.
    pub async fn recover(&self, id: BookingId) -> Result<DriveOutcome, FairwayError> {
        let Some(booking) = self.store.get(id).await? else {
            return Ok(DriveOutcome::Superseded);
        };
        match booking.status {
            BookingStatus::Claimed => {
                match self.store.release_claim(id, booking.version, Utc::now()).await? {
                    CasResult::Applied(_) => {
                        info!(%id, "released claim orphaned by an interrupted run");
                        Ok(DriveOutcome::RetryArmed)
                    }
                    CasResult::Conflict => {
                        debug!(%id, "claim moved on before it could be released");
                        Ok(DriveOutcome::Superseded)
                    }
                }
            }
            BookingStatus::Attempting => {
                info!(
                    %id,
                    attempt = booking.attempt_count,
                    "re-arming attempt orphaned by an interrupted run"
                );
                self.handle_transient(&booking, "attempt interrupted before completion")
                    .await
            }
            _ => Ok(DriveOutcome::Superseded),
        }
    }

    async fn record_outcome(
        &self,
        attempting: &Booking,
        outcome: AttemptOutcome,
    ) -> Result<DriveOutcome, FairwayError> {
        let id = attempting.id;
        match outcome {
            AttemptOutcome::Success {
                booked_slot,
                candidates,
            } => {
                match self
                    .store
                    .complete(id, attempting.version, booked_slot, &candidates)
                    .await?
                {
                    CasResult::Applied(b) => {
                        info!(%id, slot = %booked_slot, "booking secured");
                        self.notify(
                            &b,
                            NotificationKind::Success { booked_slot },
                        )
                        .await;
                        Ok(DriveOutcome::Completed)
                    }
                    CasResult::Conflict => {
                        // The slot was secured on the remote side but the
                        // request was superseded locally, most likely by a
                        // cancel. Nothing to roll back; record loudly.
                        warn!(%id, "attempt succeeded but request was superseded");
                        Ok(DriveOutcome::Superseded)
                    }
                }
            }
            AttemptOutcome::TransientFailure { reason } => {
                self.handle_transient(attempting, &reason).await
            }
            AttemptOutcome::Timeout => {
                let reason = format!(
                    "attempt timed out after {}s",
                    self.attempt_timeout.as_secs()
                );
                self.handle_transient(attempting, &reason).await
            }
            AttemptOutcome::PermanentFailure { reason } => {
                warn!(%id, %reason, "permanent failure, giving up");
                match self.store.give_up(id, attempting.version, &reason).await? {
                    CasResult::Applied(b) => {
                        self.notify(&b, NotificationKind::Failure { reason }).await;
                        Ok(DriveOutcome::GaveUp)
                    }
                    CasResult::Conflict => {
                        debug!(%id, "superseded before give-up could be recorded");
                        Ok(DriveOutcome::Superseded)
                    }
                }
            }
        }
    }

    async fn handle_transient(
        &self,
        attempting: &Booking,
        reason: &str,
    ) -> Result<DriveOutcome, FairwayError> {
        let id = attempting.id;
        match self.backoff.delay_after(attempting.attempt_count) {
            Some(delay) => {
                let next = Utc::now() + TimeDelta::seconds(delay.as_secs() as i64);
                info!(
                    %id,
                    attempt = attempting.attempt_count,
                    delay_secs = delay.as_secs(),
                    %reason,
                    "attempt failed, retry armed"
                );
                match self
                    .store
                    .schedule_retry(id, attempting.version, next, delay.as_secs(), reason)
                    .await?
                {
                    CasResult::Applied(_) => Ok(DriveOutcome::RetryArmed),
                    CasResult::Conflict => {
                        debug!(%id, "superseded before retry could be armed");
                        Ok(DriveOutcome::Superseded)
                    }
                }
            }
            None => {
                warn!(
                    %id,
                    attempts = attempting.attempt_count,
                    %reason,
                    "attempt budget exhausted, giving up"
                );
                let detail = format!(
                    "gave up after {} attempts: {reason}",
                    attempting.attempt_count
                );
                match self.store.give_up(id, attempting.version, &detail).await? {
                    CasResult::Applied(b) => {
                        self.notify(&b, NotificationKind::Failure { reason: detail })
                            .await;
                        Ok(DriveOutcome::GaveUp)
                    }
                    CasResult::Conflict => {
                        debug!(%id, "superseded before give-up could be recorded");
                        Ok(DriveOutcome::Superseded)
                    }
                }
            }
        }
    }

    /// Notification delivery is best-effort; a failed send never alters the
    /// lifecycle outcome it reports.
    async fn notify(&self, booking: &Booking, kind: NotificationKind) {
        let notification = Notification {
            public_id: booking.public_id,
            requester: booking.requester.clone(),
            requested_date: booking.requested_date,
            requested_time: booking.requested_time,
            attempt_count: booking.attempt_count,
            kind,
        };
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(id = %booking.id, error = %e, "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use fairway_core::{BookingStatus, HistoryAction, NewBooking};

    use super::*;

    /// Executor that plays back a fixed script of outcomes, one per attempt.
    struct ScriptedExecutor {
        script: Mutex<Vec<Result<AttemptOutcome, FairwayError>>>,
    }

    impl ScriptedExecutor {
        fn new(outcomes: Vec<Result<AttemptOutcome, FairwayError>>) -> Self {
            Self {
                script: Mutex::new(outcomes),
            }
        }
    }

    #[async_trait]
    impl AttemptExecutor for ScriptedExecutor {
        async fn attempt(
            &self,
            _request: &AttemptRequest,
        ) -> Result<AttemptOutcome, FairwayError> {
            self.script
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    /// Executor that never finishes, for exercising the timeout path.
    struct StallingExecutor;

    #[async_trait]
    impl AttemptExecutor for StallingExecutor {
        async fn attempt(
            &self,
            _request: &AttemptRequest,
        ) -> Result<AttemptOutcome, FairwayError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(AttemptOutcome::Timeout)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), FairwayError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Harness {
        store: BookingStore,
        notifier: Arc<RecordingNotifier>,
        controller: LifecycleController,
        _dir: tempfile::TempDir,
    }

    async fn harness(executor: Arc<dyn AttemptExecutor>, max_attempts: u32) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fairway.db");
        let store = BookingStore::open(path.to_str().unwrap()).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let controller = LifecycleController::new(
            store.clone(),
            executor,
            notifier.clone(),
            BackoffPolicy::new(max_attempts, Duration::from_secs(300), Duration::from_secs(1800)),
            Duration::from_millis(200),
        );
        Harness {
            store,
            notifier,
            controller,
            _dir: dir,
        }
    }

    async fn submit(store: &BookingStore) -> fairway_core::Booking {
        store
            .create(NewBooking {
                requester: "casey".to_string(),
                requested_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
                requested_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                eligible_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn slot(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(AttemptOutcome::Success {
            booked_slot: slot(8, 10),
            candidates: vec![slot(8, 10), slot(9, 0)],
        })]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        let outcome = h.controller.drive(b.id).await.unwrap();
        assert_eq!(outcome, DriveOutcome::Completed);

        let done = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(done.status, BookingStatus::Succeeded);
        assert_eq!(done.attempt_count, 1);
        assert_eq!(done.booked_slot, Some(slot(8, 10)));

        let actions: Vec<HistoryAction> = h
            .store
            .history(b.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::Claimed,
                HistoryAction::AttemptStarted,
                HistoryAction::AttemptSucceeded
            ]
        );

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].kind,
            NotificationKind::Success {
                booked_slot: slot(8, 10)
            }
        );
    }

    #[tokio::test]
    async fn transient_failure_arms_retry_with_persisted_instant() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(
            AttemptOutcome::TransientFailure {
                reason: "tee sheet unavailable".to_string(),
            },
        )]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        let before = Utc::now();
        let outcome = h.controller.drive(b.id).await.unwrap();
        assert_eq!(outcome, DriveOutcome::RetryArmed);

        let retried = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(retried.status, BookingStatus::RetryScheduled);
        assert_eq!(retried.attempt_count, 1);
        let next = retried.next_attempt_at.unwrap();
        // First retry waits the base delay.
        assert!(next >= before + TimeDelta::seconds(299));
        assert!(next <= Utc::now() + TimeDelta::seconds(301));

        // No notification for a non-terminal outcome.
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transient_then_success_resolves_on_second_attempt() {
        // Second attempt offers 10:45 and 11:15 against an 11:00 preference;
        // both are 15 minutes away and the earlier one wins the tie.
        let candidates = vec![slot(10, 45), slot(11, 15)];
        let preferred = slot(11, 0);
        let chosen = crate::slot::select(preferred, &candidates).unwrap();
        let executor = Arc::new(ScriptedExecutor::new(vec![
            Ok(AttemptOutcome::TransientFailure {
                reason: "no open slots".to_string(),
            }),
            Ok(AttemptOutcome::Success {
                booked_slot: chosen,
                candidates: candidates.clone(),
            }),
        ]));
        let h = harness(executor, 5).await;
        let b = h
            .store
            .create(NewBooking {
                requester: "casey".to_string(),
                requested_date: NaiveDate::from_ymd_opt(2026, 9, 18).unwrap(),
                requested_time: preferred,
                eligible_at: Utc::now(),
            })
            .await
            .unwrap();

        h.controller.drive(b.id).await.unwrap();
        // Second cycle, as the scheduler would run it once the retry is due.
        h.controller.drive(b.id).await.unwrap();

        let done = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(done.status, BookingStatus::Succeeded);
        assert_eq!(done.attempt_count, 2);
        assert_eq!(done.booked_slot, Some(slot(10, 45)));

        let actions: Vec<HistoryAction> = h
            .store
            .history(b.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::Claimed,
                HistoryAction::AttemptStarted,
                HistoryAction::AttemptFailed,
                HistoryAction::RetryArmed,
                HistoryAction::Claimed,
                HistoryAction::AttemptStarted,
                HistoryAction::AttemptSucceeded,
            ]
        );
    }

    #[tokio::test]
    async fn attempt_budget_exhaustion_gives_up_with_notification() {
        let outcomes = (0..3)
            .map(|_| {
                Ok(AttemptOutcome::TransientFailure {
                    reason: "site down".to_string(),
                })
            })
            .collect();
        let h = harness(Arc::new(ScriptedExecutor::new(outcomes)), 3).await;
        let b = submit(&h.store).await;

        assert_eq!(h.controller.drive(b.id).await.unwrap(), DriveOutcome::RetryArmed);
        assert_eq!(h.controller.drive(b.id).await.unwrap(), DriveOutcome::RetryArmed);
        assert_eq!(h.controller.drive(b.id).await.unwrap(), DriveOutcome::GaveUp);

        let failed = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(failed.status, BookingStatus::Failed);
        assert_eq!(failed.attempt_count, 3);

        let history = h.store.history(b.id).await.unwrap();
        assert_eq!(history.last().unwrap().action, HistoryAction::GivenUp);

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0].kind, NotificationKind::Failure { .. }));

        // A further drive is a no-op on the terminal request.
        drop(sent);
        assert_eq!(
            h.controller.drive(b.id).await.unwrap(),
            DriveOutcome::Superseded
        );
        let still = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(still.attempt_count, 3);
    }

    #[tokio::test]
    async fn permanent_failure_short_circuits_remaining_budget() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(
            AttemptOutcome::PermanentFailure {
                reason: "invalid credentials".to_string(),
            },
        )]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        assert_eq!(h.controller.drive(b.id).await.unwrap(), DriveOutcome::GaveUp);

        let failed = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(failed.status, BookingStatus::Failed);
        assert_eq!(failed.attempt_count, 1);
        assert_eq!(failed.error_detail.as_deref(), Some("invalid credentials"));

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
    }

    #[tokio::test]
    async fn executor_error_is_treated_as_transient() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Err(FairwayError::Executor {
            message: "connection reset".to_string(),
            source: None,
        })]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        h.controller.drive(b.id).await.unwrap();

        let retried = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(retried.status, BookingStatus::RetryScheduled);
        assert!(retried
            .error_detail
            .as_deref()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn timed_out_attempt_is_retried() {
        let h = harness(Arc::new(StallingExecutor), 5).await;
        let b = submit(&h.store).await;

        h.controller.drive(b.id).await.unwrap();

        let retried = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(retried.status, BookingStatus::RetryScheduled);
        assert!(retried
            .error_detail
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn cancelled_request_is_never_driven() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(AttemptOutcome::Success {
            booked_slot: slot(8, 0),
            candidates: vec![slot(8, 0)],
        })]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        h.store.cancel(b.id).await.unwrap().unwrap();
        assert_eq!(
            h.controller.drive(b.id).await.unwrap(),
            DriveOutcome::Superseded
        );

        let current = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(current.status, BookingStatus::Cancelled);
        assert_eq!(current.attempt_count, 0);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn interrupted_claim_is_recovered_and_driven_to_completion() {
        let executor = Arc::new(ScriptedExecutor::new(vec![Ok(AttemptOutcome::Success {
            booked_slot: slot(8, 0),
            candidates: vec![slot(8, 0)],
        })]));
        let h = harness(executor, 5).await;
        let b = submit(&h.store).await;

        // A worker claims the request and dies before starting the attempt.
        h.store.claim(b.id, b.version).await.unwrap();
        assert!(h.store.due(Utc::now()).await.unwrap().is_empty());

        assert_eq!(
            h.controller.recover(b.id).await.unwrap(),
            DriveOutcome::RetryArmed
        );
        let released = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(released.status, BookingStatus::RetryScheduled);
        assert_eq!(released.attempt_count, 0);

        // Back in the due set; the next cycle finishes the job.
        assert_eq!(h.store.due(Utc::now()).await.unwrap(), vec![b.id]);
        assert_eq!(
            h.controller.drive(b.id).await.unwrap(),
            DriveOutcome::Completed
        );
        let done = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(done.status, BookingStatus::Succeeded);
        assert_eq!(done.attempt_count, 1);
    }

    #[tokio::test]
    async fn interrupted_attempt_counts_toward_the_retry_budget() {
        let h = harness(Arc::new(ScriptedExecutor::new(vec![])), 1).await;
        let b = submit(&h.store).await;

        // A worker dies mid-attempt, having already spent the only attempt.
        let claimed = match h.store.claim(b.id, b.version).await.unwrap() {
            CasResult::Applied(b) => b,
            CasResult::Conflict => panic!(),
        };
        h.store
            .begin_attempt(b.id, claimed.version, Utc::now())
            .await
            .unwrap();

        assert_eq!(
            h.controller.recover(b.id).await.unwrap(),
            DriveOutcome::GaveUp
        );
        let failed = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(failed.status, BookingStatus::Failed);
        assert_eq!(failed.attempt_count, 1);
        assert!(failed
            .error_detail
            .as_deref()
            .unwrap()
            .contains("interrupted"));

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0].kind, NotificationKind::Failure { .. }));
    }

    #[tokio::test]
    async fn recover_leaves_live_requests_alone() {
        let h = harness(Arc::new(ScriptedExecutor::new(vec![])), 5).await;
        let b = submit(&h.store).await;

        assert_eq!(
            h.controller.recover(b.id).await.unwrap(),
            DriveOutcome::Superseded
        );
        let untouched = h.store.get(b.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, BookingStatus::Pending);
        assert_eq!(untouched.version, b.version);
    }

    #[tokio::test]
    async fn missing_request_is_skipped_without_error() {
        let executor = Arc::new(ScriptedExecutor::new(vec![]));
        let h = harness(executor, 5).await;
        assert_eq!(
            h.controller.drive(BookingId(42)).await.unwrap(),
            DriveOutcome::Superseded
        );
    }
}
