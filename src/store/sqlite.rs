// src/store/sqlite.rs
//! Persistent store on SQLite via sqlx.
//!
//! Layout: `punches(isIn, epochMillis)` indexed by time, and an append-only
//! `last_text(epochMillis)` read by "most recent".

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{NotificationRecord, Punch, PunchStore};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn read_err(e: sqlx::Error) -> StoreError {
    StoreError::Read(e.to_string())
}

fn write_err(e: sqlx::Error) -> StoreError {
    StoreError::Write(e.to_string())
}

impl SqliteStore {
    /// Connect (creating the file if needed) and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Write(format!("invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to `:memory:` is its own database; pin to one
        // connection that never gets recycled.
        let mut pool_options = SqlitePoolOptions::new().max_connections(5);
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(write_err)?;

        let store = Self { pool };
        store.init().await?;
        info!(in_memory, "SQLite punch store ready");
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS punches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                isIn BOOLEAN NOT NULL,
                epochMillis INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_punches_epoch ON punches(epochMillis)")
            .execute(&self.pool)
            .await
            .map_err(write_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS last_text (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                epochMillis INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        debug!("SQLite tables and indexes initialized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl PunchStore for SqliteStore {
    async fn list_punches(&self) -> Result<Vec<Punch>, StoreError> {
        let rows = sqlx::query_as::<_, (bool, i64)>(
            "SELECT isIn, epochMillis FROM punches ORDER BY epochMillis ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_err)?;

        Ok(rows
            .into_iter()
            .map(|(is_in, epoch_millis)| Punch {
                is_in,
                epoch_millis,
            })
            .collect())
    }

    async fn add_punch(&self, punch: Punch) -> Result<Punch, StoreError> {
        sqlx::query("INSERT INTO punches (isIn, epochMillis) VALUES (?, ?)")
            .bind(punch.is_in)
            .bind(punch.epoch_millis)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(punch)
    }

    async fn clear_punches(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM punches")
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn last_notification(&self) -> Result<Option<NotificationRecord>, StoreError> {
        let ts = sqlx::query_scalar::<_, i64>(
            "SELECT epochMillis FROM last_text ORDER BY epochMillis DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(read_err)?;
        Ok(ts.map(|epoch_millis| NotificationRecord { epoch_millis }))
    }

    async fn record_notification(&self, record: NotificationRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO last_text (epochMillis) VALUES (?)")
            .bind(record.epoch_millis)
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;
        sqlx::query("DELETE FROM punches")
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        sqlx::query("DELETE FROM last_text")
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    fn is_ephemeral(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.expect("in-memory sqlite")
    }

    #[tokio::test]
    async fn punches_round_trip_in_time_order() {
        let s = store().await;
        s.add_punch(Punch::clock_out(2_000)).await.unwrap();
        s.add_punch(Punch::clock_in(1_000)).await.unwrap();

        let all = s.list_punches().await.unwrap();
        assert_eq!(all, vec![Punch::clock_in(1_000), Punch::clock_out(2_000)]);

        s.clear_punches().await.unwrap();
        assert!(s.list_punches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_text_reads_most_recent() {
        let s = store().await;
        assert_eq!(s.last_notification().await.unwrap(), None);
        for ts in [5_000, 9_000, 7_000] {
            s.record_notification(NotificationRecord { epoch_millis: ts })
                .await
                .unwrap();
        }
        assert_eq!(
            s.last_notification().await.unwrap(),
            Some(NotificationRecord { epoch_millis: 9_000 })
        );
        assert!(!s.is_ephemeral());
    }

    #[tokio::test]
    async fn clear_all_wipes_both_tables() {
        let s = store().await;
        s.add_punch(Punch::clock_in(1_000)).await.unwrap();
        s.record_notification(NotificationRecord { epoch_millis: 2_000 })
            .await
            .unwrap();
        s.clear_all().await.unwrap();
        assert!(s.list_punches().await.unwrap().is_empty());
        assert_eq!(s.last_notification().await.unwrap(), None);
    }
}
