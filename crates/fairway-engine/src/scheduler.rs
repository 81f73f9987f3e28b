// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless polling scheduler.
//!
//! Each tick asks the store for the requests due right now and drives each
//! one through the lifecycle controller. No timers or queues survive a tick,
//! so a process restart loses nothing; the next tick recomputes the due set
//! from persisted `eligible_at` and `next_attempt_at` instants.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fairway_core::FairwayError;
use fairway_store::BookingStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::controller::LifecycleController;

pub struct Scheduler {
    store: BookingStore,
    controller: Arc<LifecycleController>,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(
        store: BookingStore,
        controller: Arc<LifecycleController>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            controller,
            poll_interval,
        }
    }

    /// Poll until `shutdown` fires. An in-flight cycle finishes before the
    /// loop exits; requests stranded mid-cycle by a killed process are
    /// re-armed by the stale scan on a later tick.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), FairwayError> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "scheduler started"
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("scheduler stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        // A failed tick must not kill the daemon; the next
                        // tick recomputes the due set from scratch.
                        error!(error = %e, "scheduler tick failed");
                    }
                }
            }
        }
    }

    /// One poll cycle: re-arm requests stranded by a dead worker, then fetch
    /// the due set and drive each request.
    pub async fn tick(&self) -> Result<(), FairwayError> {
        let cutoff = self.controller.stale_before(Utc::now());
        let stale = self.store.stale_in_flight(cutoff).await?;
        for id in stale {
            match self.controller.recover(id).await {
                Ok(outcome) => info!(%id, ?outcome, "recovered stranded request"),
                Err(e) => error!(%id, error = %e, "failed to recover stranded request"),
            }
        }

        let due = self.store.due(Utc::now()).await?;
        if due.is_empty() {
            debug!("no requests due");
            return Ok(());
        }
        info!(count = due.len(), "driving due requests");
        for id in due {
            match self.controller.drive(id).await {
                Ok(outcome) => debug!(%id, ?outcome, "drive finished"),
                // One poisoned request must not starve the rest of the batch.
                Err(e) => error!(%id, error = %e, "failed to drive request"),
            }
        }
        Ok(())
    }
}
