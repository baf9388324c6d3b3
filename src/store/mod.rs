// src/store/mod.rs
//! Punch + notification storage behind one async trait.
//!
//! Two backends: [`memory::MemoryStore`] (ephemeral, wiped at local midnight)
//! and [`sqlite::SqliteStore`] (persistent; "today" comes from day filtering).

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// One clock-in or clock-out event. Never mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Punch {
    pub is_in: bool,
    pub epoch_millis: i64,
}

impl Punch {
    pub fn clock_in(epoch_millis: i64) -> Self {
        Self {
            is_in: true,
            epoch_millis,
        }
    }

    pub fn clock_out(epoch_millis: i64) -> Self {
        Self {
            is_in: false,
            epoch_millis,
        }
    }
}

/// Timestamp of a successfully delivered reminder text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub epoch_millis: i64,
}

/// Latest punch by time; ties go to the one stored last.
pub fn last_punch(punches: &[Punch]) -> Option<Punch> {
    punches.iter().copied().max_by_key(|p| p.epoch_millis)
}

#[async_trait::async_trait]
pub trait PunchStore: Send + Sync {
    /// All punches, ascending by `epoch_millis`.
    async fn list_punches(&self) -> Result<Vec<Punch>, StoreError>;

    async fn add_punch(&self, punch: Punch) -> Result<Punch, StoreError>;

    async fn clear_punches(&self) -> Result<(), StoreError>;

    /// Most recent notification, if any was ever recorded.
    async fn last_notification(&self) -> Result<Option<NotificationRecord>, StoreError>;

    async fn record_notification(&self, record: NotificationRecord) -> Result<(), StoreError>;

    /// Wipes punches and notification history in one step.
    async fn clear_all(&self) -> Result<(), StoreError>;

    /// Whether this backend only represents "today" and needs the midnight wipe.
    fn is_ephemeral(&self) -> bool;
}

pub type SharedStore = Arc<dyn PunchStore>;
