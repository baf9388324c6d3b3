// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod calendar;
pub mod config;
pub mod duration;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod notify;
pub mod reset;
pub mod schedule;
pub mod scheduler;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::calendar::{Clock, SystemClock};
use crate::config::{Config, SenderConfig, StoreConfig};
use crate::gate::NotificationGate;
use crate::notify::{LogSender, TextSender, TwilioSender};
use crate::store::{MemoryStore, SharedStore, SqliteStore};

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::store::{NotificationRecord, Punch, PunchStore};

/// Everything the process owns: the store, the gate, and the lock the
/// background jobs share.
pub struct App {
    pub state: AppState,
    pub gate: Arc<NotificationGate>,
    pub clock: Arc<dyn Clock>,
    jobs: Arc<Mutex<()>>,
    tick_interval: Duration,
}

impl App {
    /// Wire an app from explicit parts (tests inject a manual clock / fake sender).
    pub fn from_parts(
        store: SharedStore,
        sender: Arc<dyn TextSender>,
        clock: Arc<dyn Clock>,
        cfg: &Config,
    ) -> Self {
        let jobs = Arc::new(Mutex::new(()));
        let gate = NotificationGate::new(store.clone(), sender, clock.clone(), cfg.thresholds)
            .with_job_lock(jobs.clone());
        Self {
            state: AppState::new(store),
            gate: Arc::new(gate),
            clock,
            jobs,
            tick_interval: cfg.tick_interval,
        }
    }

    /// Build the production wiring described by `cfg`.
    pub async fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let store: SharedStore = match &cfg.store {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Sqlite { url } => Arc::new(
                SqliteStore::connect(url)
                    .await
                    .context("opening punch database")?,
            ),
        };
        let sender: Arc<dyn TextSender> = match &cfg.sender {
            SenderConfig::DryRun => Arc::new(LogSender),
            SenderConfig::Twilio(t) => Arc::new(TwilioSender::new(t.clone())),
        };
        let backend = if store.is_ephemeral() { "memory" } else { "sqlite" };
        info!(
            store = backend,
            dry_run = matches!(cfg.sender, SenderConfig::DryRun),
            "app wired"
        );
        Ok(Self::from_parts(store, sender, Arc::new(SystemClock), cfg))
    }

    pub fn router(&self) -> Router {
        api::router(self.state.clone())
    }

    /// Start the gate ticker, plus the midnight wipe when the store is ephemeral.
    pub fn spawn_jobs(&self) -> Vec<JoinHandle<()>> {
        let mut handles = vec![scheduler::spawn_gate_ticker(
            self.gate.clone(),
            self.tick_interval,
        )];
        if self.state.store.is_ephemeral() {
            handles.push(reset::spawn_midnight_reset(
                self.state.store.clone(),
                self.clock.clone(),
                self.jobs.clone(),
            ));
        }
        handles
    }
}
