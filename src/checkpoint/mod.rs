//! Checkpoint module - durable, thread-keyed conversation snapshots
//!
//! Every completed agent step writes one [`Checkpoint`]: the full message
//! sequence of a thread at a new, strictly increasing version. Reads always
//! yield the full state of the latest version.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::ConversationState;
use crate::core::{Message, Result, ThreadkeepError};

pub use memory::MemoryCheckpointer;
pub use sqlite::SqliteCheckpointer;

/// A persisted snapshot of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    /// 1-based, strictly increasing per thread
    pub version: u64,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn meta(&self) -> CheckpointMeta {
        CheckpointMeta {
            thread_id: self.thread_id.clone(),
            version: self.version,
            message_count: self.messages.len(),
            created_at: self.created_at,
        }
    }

    /// Rebuild the conversation state this checkpoint captured
    pub fn into_state(self) -> ConversationState {
        ConversationState::from_messages(self.thread_id, self.messages)
    }
}

/// Checkpoint metadata without the message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub thread_id: String,
    pub version: u64,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Durable storage of conversation snapshots keyed by thread id
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist the full message sequence as the new latest checkpoint of its thread.
    ///
    /// Atomic with respect to concurrent readers.
    async fn save(&self, state: &ConversationState) -> Result<CheckpointMeta>;

    /// The most recent persisted state, or an empty state for an unknown thread
    async fn load_latest(&self, thread_id: &str) -> Result<ConversationState>;

    /// A specific historical checkpoint
    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Option<Checkpoint>>;

    /// Metadata of every checkpoint of a thread, oldest first
    async fn checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMeta>>;

    /// Every distinct thread id ever checkpointed, sorted.
    ///
    /// Malformed records are skipped, never fatal.
    async fn list_thread_ids(&self) -> Result<Vec<String>>;

    /// Remove all checkpoints of a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Thread ids are opaque; only the empty string is rejected
pub fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.is_empty() {
        return Err(ThreadkeepError::invalid_input("thread id cannot be empty"));
    }
    Ok(())
}
