// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::gate::NotificationGate;

/// Spawn the periodic gate ticker. A slow tick never causes a burst of
/// catch-up ticks; missed periods are simply dropped.
pub fn spawn_gate_ticker(gate: Arc<NotificationGate>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval fires immediately; wait a full period.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = gate.run_tick().await;
            tracing::trace!(target: "scheduler", ?outcome, "gate tick");
        }
    })
}
