// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slot selection: pick the candidate time closest to a preference.

use chrono::NaiveTime;

/// Select the candidate closest to `preferred` by absolute distance in
/// seconds. Distance is symmetric; a candidate 10 minutes early and one
/// 10 minutes late are equally good, and the earlier of the two wins.
/// Returns `None` for an empty candidate set.
pub fn select(preferred: NaiveTime, candidates: &[NaiveTime]) -> Option<NaiveTime> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&c| ((c - preferred).num_seconds().abs(), c))
}
