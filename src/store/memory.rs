// src/store/memory.rs
use tokio::sync::Mutex;

use super::{NotificationRecord, Punch, PunchStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    punches: Vec<Punch>,
    texts: Vec<NotificationRecord>,
}

/// In-process store. Both collections sit behind one lock so a midnight wipe
/// can never interleave with an append.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PunchStore for MemoryStore {
    async fn list_punches(&self) -> Result<Vec<Punch>, StoreError> {
        let g = self.inner.lock().await;
        let mut out = g.punches.clone();
        out.sort_by_key(|p| p.epoch_millis);
        Ok(out)
    }

    async fn add_punch(&self, punch: Punch) -> Result<Punch, StoreError> {
        self.inner.lock().await.punches.push(punch);
        Ok(punch)
    }

    async fn clear_punches(&self) -> Result<(), StoreError> {
        self.inner.lock().await.punches.clear();
        Ok(())
    }

    async fn last_notification(&self) -> Result<Option<NotificationRecord>, StoreError> {
        let g = self.inner.lock().await;
        Ok(g.texts.iter().copied().max_by_key(|t| t.epoch_millis))
    }

    async fn record_notification(&self, record: NotificationRecord) -> Result<(), StoreError> {
        self.inner.lock().await.texts.push(record);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut g = self.inner.lock().await;
        g.punches.clear();
        g.texts.clear();
        Ok(())
    }

    fn is_ephemeral(&self) -> bool {
        true
    }
}
