// src/reset.rs
//! Midnight Reset for the ephemeral store: at 00:00 local, wipe punches and
//! notification history so the store only ever holds "today".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::calendar::{Clock, LocalCalendar};
use crate::error::StoreError;
use crate::store::SharedStore;

/// How long to sleep from `now` until the next local midnight.
pub fn until_next_midnight(calendar: &LocalCalendar, now: DateTime<Utc>) -> Duration {
    (calendar.next_midnight(now) - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Wipe everything, holding the job lock so no gate tick sees a half-cleared store.
pub async fn run_reset(
    store: &SharedStore,
    jobs: &Mutex<()>,
    calendar: &LocalCalendar,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let _guard = jobs.lock().await;
    store.clear_all().await?;
    counter!("midnight_resets_total").increment(1);
    info!(
        target: "reset",
        local = %calendar.local(now).to_rfc3339(),
        "Clearing data at midnight"
    );
    Ok(())
}

pub fn spawn_midnight_reset(
    store: SharedStore,
    clock: Arc<dyn Clock>,
    jobs: Arc<Mutex<()>>,
) -> JoinHandle<()> {
    let calendar = LocalCalendar::default();
    tokio::spawn(async move {
        loop {
            let target = calendar.next_midnight(clock.now());
            // Re-check after waking: never clear even a moment before midnight.
            loop {
                let now = clock.now();
                if now >= target {
                    break;
                }
                tokio::time::sleep(until_next_midnight(&calendar, now)).await;
            }

            if let Err(e) = run_reset(&store, &jobs, &calendar, clock.now()).await {
                warn!(target: "reset", "midnight reset failed: {e:#}");
            }
        }
    })
}
