//! SQLite checkpointer
//!
//! One row per checkpoint in a `checkpoints` table keyed by
//! `(thread_id, version)`, holding the full message sequence as JSON.
//! `rusqlite` is synchronous, so every operation runs on the blocking pool.
//! WAL mode lets readers proceed while a turn is writing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{validate_thread_id, Checkpoint, CheckpointMeta, Checkpointer};
use crate::agent::ConversationState;
use crate::core::{Message, Result, ThreadkeepError};

/// Checkpointer backed by a SQLite database file
pub struct SqliteCheckpointer {
    conn: Arc<Mutex<Connection>>,
    location: String,
}

impl SqliteCheckpointer {
    /// Open (or create) the checkpoint database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn, path.display().to_string())
    }

    /// A private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::create_tables(&conn)?;
        tracing::debug!(location = %location, "checkpoint store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        })
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    // thread_id stays nullable so rows written by older tools can still be
    // scanned (and skipped) during enumeration.
    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT,
                version INTEGER NOT NULL,
                messages TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (thread_id, version)
            );
            ",
        )?;
        Ok(())
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| ThreadkeepError::storage("checkpoint connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| ThreadkeepError::storage(format!("checkpoint task failed: {}", e)))?
    }
}

fn decode_messages(thread_id: &str, version: u64, raw: &str) -> Result<Vec<Message>> {
    serde_json::from_str(raw).map_err(|e| {
        ThreadkeepError::storage(format!(
            "corrupt checkpoint {} v{}: {}",
            thread_id, version, e
        ))
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ThreadkeepError::storage(format!("bad checkpoint timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn save(&self, state: &ConversationState) -> Result<CheckpointMeta> {
        validate_thread_id(state.thread_id())?;

        let thread_id = state.thread_id().to_string();
        let payload = serde_json::to_string(state.messages())?;
        let message_count = state.len();
        let created_at = Utc::now();

        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let version: i64 = tx.query_row(
                "SELECT COALESCE(MAX(version), 0) + 1 FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO checkpoints (thread_id, version, messages, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![thread_id, version, payload, created_at.to_rfc3339()],
            )?;
            tx.commit()?;

            Ok(CheckpointMeta {
                thread_id,
                version: version as u64,
                message_count,
                created_at,
            })
        })
        .await
    }

    async fn load_latest(&self, thread_id: &str) -> Result<ConversationState> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| {
            let row: Option<(i64, String)> = conn
                .query_row(
                    "SELECT version, messages FROM checkpoints
                     WHERE thread_id = ?1
                     ORDER BY version DESC
                     LIMIT 1",
                    params![thread_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((version, raw)) => {
                    let messages = decode_messages(&thread_id, version as u64, &raw)?;
                    Ok(ConversationState::from_messages(thread_id, messages))
                }
                None => Ok(ConversationState::empty(thread_id)),
            }
        })
        .await
    }

    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Option<Checkpoint>> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| {
            let row: Option<(String, String)> = conn
                .query_row(
                    "SELECT messages, created_at FROM checkpoints
                     WHERE thread_id = ?1 AND version = ?2",
                    params![thread_id, version as i64],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            row.map(|(raw, created_at)| -> Result<Checkpoint> {
                Ok(Checkpoint {
                    messages: decode_messages(&thread_id, version, &raw)?,
                    created_at: parse_timestamp(&created_at)?,
                    thread_id: thread_id.clone(),
                    version,
                })
            })
            .transpose()
        })
        .await
    }

    async fn checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMeta>> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT version, messages, created_at FROM checkpoints
                 WHERE thread_id = ?1
                 ORDER BY version ASC",
            )?;
            let rows = stmt.query_map(params![thread_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut metas = Vec::new();
            for row in rows {
                let (version, raw, created_at) = row?;
                let version = version as u64;
                metas.push(CheckpointMeta {
                    thread_id: thread_id.clone(),
                    version,
                    message_count: decode_messages(&thread_id, version, &raw)?.len(),
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(metas)
        })
        .await
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT thread_id FROM checkpoints")?;
            let rows = stmt.query_map([], |row| row.get::<_, Option<String>>(0))?;

            let mut ids = BTreeSet::new();
            for row in rows {
                match row {
                    Ok(Some(id)) if !id.is_empty() => {
                        ids.insert(id);
                    }
                    Ok(_) => {
                        tracing::warn!("skipping checkpoint record without a thread id");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable checkpoint record");
                    }
                }
            }
            Ok(ids.into_iter().collect())
        })
        .await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let thread_id = thread_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
            )?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_save_and_load() {
        let store = SqliteCheckpointer::in_memory().unwrap();
        let state = ConversationState::from_messages("t1", vec![Message::user("hello")]);

        let meta = store.save(&state).await.unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.message_count, 1);

        let loaded = store.load_latest("t1").await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let store = SqliteCheckpointer::in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO checkpoints (thread_id, version, messages, created_at)
                     VALUES ('bad', 1, 'not json', '2024-01-01T00:00:00Z')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store.load_latest("bad").await.unwrap_err();
        assert!(matches!(err, ThreadkeepError::Storage(_)));
    }

    #[tokio::test]
    async fn test_list_skips_null_and_non_text_ids() {
        let store = SqliteCheckpointer::in_memory().unwrap();
        store
            .save(&ConversationState::from_messages("good", vec![Message::user("x")]))
            .await
            .unwrap();
        store
            .with_conn(|conn| {
                conn.execute_batch(
                    "INSERT INTO checkpoints (thread_id, version, messages, created_at)
                     VALUES (NULL, 1, '[]', '2024-01-01T00:00:00Z');
                     INSERT INTO checkpoints (thread_id, version, messages, created_at)
                     VALUES ('', 1, '[]', '2024-01-01T00:00:00Z');
                     INSERT INTO checkpoints (thread_id, version, messages, created_at)
                     VALUES (x'00ff', 1, '[]', '2024-01-01T00:00:00Z');",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.list_thread_ids().await.unwrap(), vec!["good".to_string()]);
    }
}
