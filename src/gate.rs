// src/gate.rs
//! # Notification Gate
//! Once per tick: read punches and the last-sent watermark, decide whether a
//! reminder text is due, send it, and only on confirmed delivery record the
//! new watermark.
//!
//! The decision itself ([`evaluate`]) is pure; [`NotificationGate::tick`] does
//! the I/O around it and [`NotificationGate::run_tick`] is what the scheduler
//! calls (errors are logged and swallowed, overlapping ticks are skipped).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::calendar::{Clock, LocalCalendar};
use crate::config::Thresholds;
use crate::duration::compute_in_duration_today;
use crate::error::GateError;
use crate::notify::TextSender;
use crate::schedule::{is_after_hours, is_lunch_break, is_night_or_weekend};
use crate::store::{last_punch, NotificationRecord, Punch, SharedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    /// Clocked in past the daily limit.
    WrapItUp,
    /// Clocked out too long during working hours.
    WhereYouAt,
}

impl Reminder {
    pub fn message(self) -> &'static str {
        match self {
            Reminder::WrapItUp => "Ok, wrap it up.",
            Reminder::WhereYouAt => "Where you at?",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Reminder::WrapItUp => "wrap_it_up",
            Reminder::WhereYouAt => "where_you_at",
        }
    }
}

/// What a single tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    OffHours,
    NoPunches,
    /// A text already went out after the latest punch.
    AlreadyNotified,
    NotDue,
    Sent(Reminder),
    /// Previous tick (or the midnight reset) still holds the job lock.
    Skipped,
}

/// Result of the pure decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Send(Reminder),
    Hold(TickOutcome),
}

/// Everything [`evaluate`] looks at, read fresh for one tick.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub punches: &'a [Punch],
    pub last_notification: Option<NotificationRecord>,
    pub now: DateTime<Utc>,
}

/// Pure decision step: either the reminder to send or why nothing is sent.
pub fn evaluate(
    input: GateInput<'_>,
    thresholds: &Thresholds,
    calendar: &LocalCalendar,
) -> Decision {
    let now = input.now;
    if is_night_or_weekend(calendar, now) {
        return Decision::Hold(TickOutcome::OffHours);
    }

    let Some(last) = last_punch(input.punches) else {
        debug!(target: "gate", "no punches");
        return Decision::Hold(TickOutcome::NoPunches);
    };

    if let Some(sent) = input.last_notification {
        if sent.epoch_millis > last.epoch_millis {
            debug!(
                target: "gate",
                last_text = sent.epoch_millis,
                last_punch = last.epoch_millis,
                "already sent text"
            );
            return Decision::Hold(TickOutcome::AlreadyNotified);
        }
    }

    let in_duration = compute_in_duration_today(input.punches, now, calendar);

    if last.is_in {
        debug!(target: "gate", in_duration, "IN");
        if in_duration > thresholds.max_in_ms {
            return Decision::Send(Reminder::WrapItUp);
        }
    } else {
        let out_for = now.timestamp_millis().saturating_sub(last.epoch_millis);
        debug!(target: "gate", in_duration, out_for, "OUT");
        if !is_after_hours(calendar, now)
            && !is_lunch_break(calendar, now)
            && out_for > thresholds.max_out_ms
        {
            return Decision::Send(Reminder::WhereYouAt);
        }
    }

    Decision::Hold(TickOutcome::NotDue)
}

pub struct NotificationGate {
    store: SharedStore,
    sender: Arc<dyn TextSender>,
    clock: Arc<dyn Clock>,
    calendar: LocalCalendar,
    thresholds: Thresholds,
    jobs: Arc<Mutex<()>>,
}

impl NotificationGate {
    pub fn new(
        store: SharedStore,
        sender: Arc<dyn TextSender>,
        clock: Arc<dyn Clock>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            calendar: LocalCalendar::default(),
            thresholds,
            jobs: Arc::new(Mutex::new(())),
        }
    }

    /// Share a job lock with other background work (the midnight reset) so
    /// the two never run interleaved.
    pub fn with_job_lock(mut self, jobs: Arc<Mutex<()>>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn job_lock(&self) -> Arc<Mutex<()>> {
        self.jobs.clone()
    }

    /// One read → decide → send → record pass.
    pub async fn tick(&self) -> Result<TickOutcome, GateError> {
        let Ok(_guard) = self.jobs.try_lock() else {
            return Ok(TickOutcome::Skipped);
        };

        // Off-hours needs no store access at all.
        if is_night_or_weekend(&self.calendar, self.clock.now()) {
            return Ok(TickOutcome::OffHours);
        }

        let punches = self.store.list_punches().await?;
        let last_notification = self.store.last_notification().await?;
        // Decide with the time after the reads, not before them.
        let input = GateInput {
            punches: &punches,
            last_notification,
            now: self.clock.now(),
        };

        let reminder = match evaluate(input, &self.thresholds, &self.calendar) {
            Decision::Send(r) => r,
            Decision::Hold(outcome) => return Ok(outcome),
        };

        info!(target: "gate", message = reminder.message(), "sending text");
        let delivery = match self.sender.send(reminder.message()).await {
            Ok(d) => d,
            Err(e) => {
                counter!("text_send_failures_total").increment(1);
                return Err(e.into());
            }
        };

        let sent_at = self.clock.now_millis();
        self.store
            .record_notification(NotificationRecord {
                epoch_millis: sent_at,
            })
            .await?;

        counter!("texts_sent_total", "reminder" => reminder.label()).increment(1);
        info!(
            target: "gate",
            provider_id = delivery.provider_id.as_deref().unwrap_or("-"),
            sent_at,
            "text sent"
        );
        Ok(TickOutcome::Sent(reminder))
    }

    /// Scheduler entry point: never fails, never panics the ticker.
    pub async fn run_tick(&self) -> Option<TickOutcome> {
        counter!("gate_ticks_total").increment(1);
        match self.tick().await {
            Ok(TickOutcome::Skipped) => {
                warn!(target: "gate", "previous job still running, tick skipped");
                Some(TickOutcome::Skipped)
            }
            Ok(outcome) => {
                debug!(target: "gate", ?outcome, "tick done");
                Some(outcome)
            }
            Err(e) => {
                counter!("gate_tick_errors_total").increment(1);
                warn!(target: "gate", "gate tick failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{ManualClock, HOME_TZ};
    use crate::notify::{FailingSender, RecordingSender};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    const MIN: i64 = 60_000;
    const HOUR: i64 = 60 * MIN;

    const T: Thresholds = Thresholds {
        max_in_ms: 4 * HOUR,
        max_out_ms: 30 * MIN,
    };

    // 2024-06-04 is a Tuesday.
    fn tue(h: u32, mi: u32) -> DateTime<Utc> {
        HOME_TZ
            .with_ymd_and_hms(2024, 6, 4, h, mi, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ms(h: u32, mi: u32) -> i64 {
        tue(h, mi).timestamp_millis()
    }

    fn decide(punches: &[Punch], last: Option<i64>, now: DateTime<Utc>) -> Decision {
        let input = GateInput {
            punches,
            last_notification: last.map(|epoch_millis| NotificationRecord { epoch_millis }),
            now,
        };
        evaluate(input, &T, &LocalCalendar::default())
    }

    #[test]
    fn out_too_long_during_work_hours() {
        let punches = [Punch::clock_in(ms(9, 0)), Punch::clock_out(ms(9, 30))];
        assert_eq!(decide(&punches, None, tue(10, 1)), Decision::Send(Reminder::WhereYouAt));
        assert_eq!(decide(&punches, None, tue(10, 0)), Decision::Hold(TickOutcome::NotDue));
    }

    #[test]
    fn lunch_and_after_hours_suppress_where_you_at() {
        let punches = [Punch::clock_in(ms(9, 0)), Punch::clock_out(ms(11, 0))];
        assert_eq!(decide(&punches, None, tue(12, 15)), Decision::Hold(TickOutcome::NotDue));
        assert_eq!(decide(&punches, None, tue(17, 30)), Decision::Hold(TickOutcome::NotDue));
        assert_eq!(decide(&punches, None, tue(14, 0)), Decision::Send(Reminder::WhereYouAt));
    }

    #[test]
    fn in_branch_ignores_lunch() {
        let punches = [Punch::clock_in(ms(8, 0))];
        assert_eq!(decide(&punches, None, tue(12, 0)), Decision::Hold(TickOutcome::NotDue));
        assert_eq!(decide(&punches, None, tue(12, 1)), Decision::Send(Reminder::WrapItUp));
        assert_eq!(decide(&punches, None, tue(11, 0)), Decision::Hold(TickOutcome::NotDue));
    }

    #[test]
    fn in_branch_uses_daily_total_not_session_length() {
        // 3h this morning + 1h01m since lunch = over 4h.
        let punches = [
            Punch::clock_in(ms(9, 0)),
            Punch::clock_out(ms(12, 0)),
            Punch::clock_in(ms(13, 0)),
        ];
        assert_eq!(decide(&punches, None, tue(14, 0)), Decision::Hold(TickOutcome::NotDue));
        assert_eq!(decide(&punches, None, tue(14, 1)), Decision::Send(Reminder::WrapItUp));
    }

    #[test]
    fn watermark_after_last_punch_blocks() {
        let punches = [Punch::clock_out(ms(9, 0))];
        assert_eq!(
            decide(&punches, Some(ms(9, 45)), tue(11, 0)),
            Decision::Hold(TickOutcome::AlreadyNotified)
        );
        // A text at exactly the punch time does not count as "after".
        assert_eq!(decide(&punches, Some(ms(9, 0)), tue(11, 0)), Decision::Send(Reminder::WhereYouAt));
        // An older text is superseded by the newer punch.
        assert_eq!(decide(&punches, Some(ms(8, 0)), tue(11, 0)), Decision::Send(Reminder::WhereYouAt));
    }

    #[test]
    fn off_hours_and_empty_short_circuit() {
        let punches = [Punch::clock_out(ms(9, 0))];
        assert_eq!(decide(&punches, None, tue(20, 0)), Decision::Hold(TickOutcome::OffHours));
        assert_eq!(decide(&[], None, tue(10, 0)), Decision::Hold(TickOutcome::NoPunches));
    }

    #[test]
    fn last_punch_is_latest_by_time() {
        // Stored out of order: the 9:30 "in" is the real latest state.
        let punches = [Punch::clock_in(ms(9, 30)), Punch::clock_out(ms(9, 0))];
        assert_eq!(decide(&punches, None, tue(11, 0)), Decision::Hold(TickOutcome::NotDue));
    }

    #[test]
    fn extreme_punch_times_do_not_overflow() {
        let ancient = [Punch::clock_out(i64::MIN)];
        assert_eq!(decide(&ancient, None, tue(10, 0)), Decision::Send(Reminder::WhereYouAt));

        let far_future = [Punch::clock_in(i64::MAX)];
        assert_eq!(decide(&far_future, None, tue(10, 0)), Decision::Hold(TickOutcome::NotDue));
    }

    fn gate_with(
        store: SharedStore,
        sender: Arc<dyn TextSender>,
        clock: Arc<ManualClock>,
    ) -> NotificationGate {
        NotificationGate::new(store, sender, clock, T)
    }

    #[tokio::test]
    async fn send_failure_does_not_advance_watermark() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.add_punch(Punch::clock_out(ms(9, 0))).await.unwrap();
        let clock = Arc::new(ManualClock::new(tue(10, 0)));
        let sender = Arc::new(FailingSender::default());
        let gate = gate_with(store.clone(), sender.clone(), clock.clone());

        assert!(matches!(gate.tick().await, Err(GateError::Send(_))));
        assert_eq!(store.last_notification().await.unwrap(), None);

        // Next tick tries again and the scheduler wrapper swallows the error.
        clock.advance(chrono::Duration::minutes(1));
        assert_eq!(gate.run_tick().await, None);
        assert_eq!(*sender.attempts.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn held_job_lock_skips_tick() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.add_punch(Punch::clock_out(ms(9, 0))).await.unwrap();
        let sender = Arc::new(RecordingSender::new());
        let gate = gate_with(store, sender.clone(), Arc::new(ManualClock::new(tue(10, 0))));

        let lock = gate.job_lock();
        let held = lock.lock().await;
        assert_eq!(gate.tick().await.unwrap(), TickOutcome::Skipped);
        drop(held);

        assert_eq!(gate.tick().await.unwrap(), TickOutcome::Sent(Reminder::WhereYouAt));
        assert_eq!(sender.messages(), vec!["Where you at?".to_string()]);
    }

    #[tokio::test]
    async fn ticker_task_survives_extreme_punch() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.add_punch(Punch::clock_out(i64::MIN)).await.unwrap();
        let sender = Arc::new(RecordingSender::new());
        let gate = Arc::new(gate_with(
            store,
            sender.clone(),
            Arc::new(ManualClock::new(tue(10, 0))),
        ));

        let first = tokio::spawn({
            let gate = gate.clone();
            async move { gate.run_tick().await }
        });
        assert_eq!(
            first.await.unwrap(),
            Some(TickOutcome::Sent(Reminder::WhereYouAt))
        );
        assert_eq!(gate.run_tick().await, Some(TickOutcome::AlreadyNotified));
        assert_eq!(sender.messages().len(), 1);
    }
}
