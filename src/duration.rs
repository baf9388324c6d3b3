// src/duration.rs
//! # Daily Duration Calculator
//! Pure: punches + frozen `now` → milliseconds clocked in today.
//!
//! Walks today's punches in time order holding one open "in" marker. A second
//! "in" while one is open is a no-op (the first wins); an "out" with no open
//! marker is ignored. A marker still open at the end runs live up to `now`.

use chrono::{DateTime, Utc};

use crate::calendar::LocalCalendar;
use crate::store::Punch;

pub fn compute_in_duration_today(
    punches: &[Punch],
    now: DateTime<Utc>,
    calendar: &LocalCalendar,
) -> i64 {
    let (start, end) = calendar.day_bounds(now);
    let (start_ms, end_ms) = (start.timestamp_millis(), end.timestamp_millis());

    let mut today: Vec<Punch> = punches
        .iter()
        .copied()
        .filter(|p| (start_ms..=end_ms).contains(&p.epoch_millis))
        .collect();
    // Stable: equal timestamps keep their stored order.
    today.sort_by_key(|p| p.epoch_millis);

    let mut total: i64 = 0;
    let mut open_since: Option<i64> = None;

    for punch in &today {
        match (punch.is_in, open_since) {
            (true, None) => open_since = Some(punch.epoch_millis),
            (false, Some(since)) => {
                total += punch.epoch_millis - since;
                open_since = None;
            }
            _ => {}
        }
    }

    if let Some(since) = open_since {
        // A future-dated "in" contributes nothing yet.
        total += (now.timestamp_millis() - since).max(0);
    }

    total
}
