use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::info;

use storefront_core::event::NewEvent;

use crate::schema::{init_sql, TIMESTAMP_FORMAT};

/// Generate a cryptographically random hex string of `n` bytes (2n hex chars).
pub(crate) fn rand_hex(n: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Render a UTC instant the way every `TIMESTAMP` column is written.
pub(crate) fn sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// The storefront's DuckDB store.
///
/// Opened once at startup and handed to the server through `AppState`.
/// DuckDB is single-writer: the connection sits behind `Arc<Mutex<_>>` so
/// every statement is serialised by the async runtime while the backend stays
/// cheap to share across handlers and the page-view flush task.
pub struct DuckDbBackend {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl DuckDbBackend {
    /// Open (or create) a DuckDB database file at `path`.
    ///
    /// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`.
    /// Runs the schema init SQL so all tables and indexes exist.
    pub fn open(path: &str, memory_limit: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&init_sql(memory_limit))?;
        Self::seed_settings_sync(&conn)?;
        info!(
            "DuckDB opened at {} with memory_limit={}, threads=2",
            path, memory_limit
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an **in-memory** DuckDB database.
    ///
    /// Intended for tests only; data is discarded when the struct is dropped.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(&init_sql("1GB"))?;
        Self::seed_settings_sync(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn seed_settings_sync(conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES ('version', ?1)",
            duckdb::params!["1"],
        )?;
        Ok(())
    }

    /// Append a batch of events in a single transaction.
    ///
    /// `id` and `created_at` are assigned here, at insert time. Every row of
    /// one batch shares the same `created_at`.
    pub async fn insert_events(&self, events: &[NewEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let created_at = sql_timestamp(&Utc::now());

        let tx = conn.transaction()?;
        for event in events {
            tx.execute(
                r#"INSERT INTO events (id, event_type, subject, path, identifier, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, CAST(?6 AS TIMESTAMP))"#,
                duckdb::params![
                    uuid::Uuid::new_v4().to_string(),
                    event.event_type.as_str(),
                    event.subject,
                    event.path,
                    event.identifier,
                    created_at,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = events.len(), "Inserted events into DuckDB");
        Ok(())
    }

    /// Execute `SELECT 1` as a lightweight liveness check.
    pub async fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("SELECT 1")?;
        Ok(())
    }

    /// Acquire the DuckDB connection lock for direct queries.
    ///
    /// Intended for integration tests that need to seed or verify stored
    /// rows. Production code should use the typed methods.
    pub async fn conn_for_test(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
