// SPDX-FileCopyrightText: 2026 Fairway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tee-sheet markup parsing.
//!
//! The tee sheet renders one container per starting time; open times carry
//! the `openTee` class and a `data-time` attribute with the 24-hour slot
//! time. Booked times lack the class, so matching on it alone is enough.

use std::sync::OnceLock;

use chrono::NaiveTime;
use regex::Regex;
use tracing::debug;

fn open_tee_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"class="[^"]*\bopenTee\b[^"]*"[^>]*data-time="(\d{1,2}:\d{2})""#)
            .expect("static pattern is valid")
    })
}

/// Extract the open slot times from a tee-sheet page, sorted and deduplicated.
/// Unparseable `data-time` values are skipped, not fatal.
pub fn open_slots(html: &str) -> Vec<NaiveTime> {
    let mut slots: Vec<NaiveTime> = open_tee_pattern()
        .captures_iter(html)
        .filter_map(|c| {
            let raw = &c[1];
            match NaiveTime::parse_from_str(raw, "%H:%M") {
                Ok(t) => Some(t),
                Err(e) => {
                    debug!(raw, error = %e, "skipping unparseable slot time");
                    None
                }
            }
        })
        .collect();
    slots.sort_unstable();
    slots.dedup();
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn extracts_open_slots_only() {
        let html = r#"
            <div id="AM1_1" class="tsSection openTee" data-time="07:30">Reserve</div>
            <div id="AM1_2" class="tsSection bookedTee" data-time="07:40">Taken</div>
            <div id="AM1_3" class="tsSection openTee" data-time="08:10">Reserve</div>
        "#;
        assert_eq!(open_slots(html), vec![t(7, 30), t(8, 10)]);
    }

    #[test]
    fn result_is_sorted_and_deduplicated() {
        let html = r#"
            <div class="openTee" data-time="14:00"></div>
            <div class="openTee" data-time="08:10"></div>
            <div class="openTee" data-time="14:00"></div>
        "#;
        assert_eq!(open_slots(html), vec![t(8, 10), t(14, 0)]);
    }

    #[test]
    fn garbage_times_are_skipped() {
        let html = r#"
            <div class="openTee" data-time="99:99"></div>
            <div class="openTee" data-time="09:00"></div>
        "#;
        assert_eq!(open_slots(html), vec![t(9, 0)]);
    }

    #[test]
    fn page_without_open_slots_yields_empty() {
        let html = r#"<div class="tsSection bookedTee" data-time="07:30"></div>"#;
        assert!(open_slots(html).is_empty());
    }
}
