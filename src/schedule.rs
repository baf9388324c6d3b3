// src/schedule.rs
//! Schedule Classifier: time-of-day / day-of-week predicates in local time.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::calendar::LocalCalendar;

/// Lunch window, inclusive on both ends: 11:50 through 13:30.
const LUNCH_START: (u32, u32) = (11, 50);
const LUNCH_END: (u32, u32) = (13, 30);

/// Working hours are [09:00, 19:00) on weekdays.
const DAY_START_HOUR: u32 = 9;
const NIGHT_START_HOUR: u32 = 19;

/// "Where you at?" stops being asked after 17:15.
const WRAP_UP: (u32, u32) = (17, 15);

fn hm(calendar: &LocalCalendar, now: DateTime<Utc>) -> (u32, u32) {
    let local = calendar.local(now);
    (local.hour(), local.minute())
}

pub fn is_lunch_break(calendar: &LocalCalendar, now: DateTime<Utc>) -> bool {
    let t = hm(calendar, now);
    LUNCH_START <= t && t <= LUNCH_END
}

pub fn is_night_or_weekend(calendar: &LocalCalendar, now: DateTime<Utc>) -> bool {
    let local = calendar.local(now);
    let weekend = matches!(local.weekday(), Weekday::Sat | Weekday::Sun);
    let night = local.hour() >= NIGHT_START_HOUR || local.hour() < DAY_START_HOUR;
    weekend || night
}

pub fn is_after_hours(calendar: &LocalCalendar, now: DateTime<Utc>) -> bool {
    is_night_or_weekend(calendar, now) || hm(calendar, now) > WRAP_UP
}
