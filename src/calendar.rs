// src/calendar.rs
//! Local calendar math in one fixed timezone, plus the injectable clock.
//!
//! All instants are UTC (`DateTime<Utc>` or epoch millis); the calendar is the
//! only place that knows about the local zone. Day boundaries are computed in
//! local time and converted back, so 23h/25h DST days come out right.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// The single zone the tracker works in.
pub const HOME_TZ: Tz = chrono_tz::America::Los_Angeles;

/// Source of "now". Tests swap in [`ManualClock`].
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant until moved explicitly.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn at_millis(epoch_millis: i64) -> Self {
        Self::new(from_millis(epoch_millis))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut g = self.now.lock().expect("clock mutex poisoned");
        *g += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Epoch millis → UTC instant. Out-of-range values clamp to the epoch.
pub fn from_millis(epoch_millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(epoch_millis).unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct LocalCalendar {
    tz: Tz,
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::new(HOME_TZ)
    }
}

impl LocalCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    /// First instant of `date` in local time. Midnight can be skipped by a
    /// DST jump in some zones; in that case the first existing hour wins.
    fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        for hour in 0..24 {
            let Some(naive) = date.and_hms_opt(hour, 0, 0) else {
                continue;
            };
            if let Some(dt) = self.tz.from_local_datetime(&naive).earliest() {
                return dt.with_timezone(&Utc);
            }
        }
        // Unreachable for real zones: no zone skips a whole day of hours.
        date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    /// Inclusive `[start, end]` of the local day containing `now`.
    /// `end` is one millisecond before the next local midnight.
    pub fn day_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = self.local(now).date_naive();
        let start = self.start_of(today);
        let end = self.next_midnight(now) - Duration::milliseconds(1);
        (start, end)
    }

    /// Next local midnight strictly after `now`.
    pub fn next_midnight(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.local(now).date_naive();
        match today.succ_opt() {
            Some(tomorrow) => self.start_of(tomorrow),
            None => now + Duration::days(1),
        }
    }
}
