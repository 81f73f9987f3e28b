// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry pacing: capped exponential backoff with a bounded attempt budget.

use std::time::Duration;

/// Deterministic backoff policy. Pure; holds no clock and no per-request
/// state, so the same inputs always produce the same answer.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after a failed attempt number `attempts_made` (1-based),
    /// or `None` when the attempt budget is exhausted.
    ///
    /// The first retry waits the base delay; each subsequent retry doubles
    /// it, saturating at the cap.
    pub fn delay_after(&self, attempts_made: u32) -> Option<Duration> {
        if attempts_made >= self.max_attempts {
            return None;
        }
        let exponent = attempts_made.saturating_sub(1).min(32);
        let factor = 2u64.saturating_pow(exponent);
        let delay = self
            .base_delay
            .saturating_mul(factor.min(u32::MAX as u64) as u32);
        Some(delay.min(self.max_delay))
    }
}
