//! In-memory checkpointer for tests and ephemeral sessions

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{validate_thread_id, Checkpoint, CheckpointMeta, Checkpointer};
use crate::agent::ConversationState;
use crate::core::Result;

/// Checkpoints held in process memory; lost on exit
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Checkpoint>>>,
}

impl MemoryCheckpointer {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn save(&self, state: &ConversationState) -> Result<CheckpointMeta> {
        validate_thread_id(state.thread_id())?;

        let mut threads = self.threads.write().await;
        let history = threads.entry(state.thread_id().to_string()).or_default();
        let version = history.last().map_or(1, |c| c.version + 1);
        let checkpoint = Checkpoint {
            thread_id: state.thread_id().to_string(),
            version,
            messages: state.messages().to_vec(),
            created_at: Utc::now(),
        };
        let meta = checkpoint.meta();
        history.push(checkpoint);
        Ok(meta)
    }

    async fn load_latest(&self, thread_id: &str) -> Result<ConversationState> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .and_then(|history| history.last())
            .map(|c| c.clone().into_state())
            .unwrap_or_else(|| ConversationState::empty(thread_id)))
    }

    async fn load_version(&self, thread_id: &str, version: u64) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .and_then(|history| history.iter().find(|c| c.version == version))
            .cloned())
    }

    async fn checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMeta>> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|history| history.iter().map(Checkpoint::meta).collect())
            .unwrap_or_default())
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        let threads = self.threads.read().await;
        let mut ids: Vec<String> = threads
            .iter()
            .filter(|(_, history)| !history.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.threads.write().await.remove(thread_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
