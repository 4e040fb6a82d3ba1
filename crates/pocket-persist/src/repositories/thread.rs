use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{PersistError, Result};
use crate::models::Thread;
use crate::trait_client::StorageBackend;

/// Storage key holding the serialized thread list
pub const DEFAULT_HISTORY_KEY: &str = "chatHistory";

/// Snapshot persistence for the thread list
///
/// The whole list is serialized as one JSON array and overwritten on every
/// save; there are no incremental updates.
#[derive(Clone)]
pub struct ThreadRepository {
    backend: Arc<dyn StorageBackend>,
    key: String,
}

impl ThreadRepository {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_key(backend, DEFAULT_HISTORY_KEY)
    }

    pub fn with_key(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the thread list, surfacing decode failures
    ///
    /// Absent or blank content is an empty list. Threads whose id was
    /// already seen are dropped, keeping the first (most recent) one.
    pub async fn try_load(&self) -> Result<Vec<Thread>> {
        let Some(raw) = self.backend.get(&self.key).await? else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let threads: Vec<Thread> =
            serde_json::from_str(&raw).map_err(|source| PersistError::Decode {
                key: self.key.clone(),
                source,
            })?;

        let mut seen = HashSet::new();
        let total = threads.len();
        let unique: Vec<Thread> = threads
            .into_iter()
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        if unique.len() != total {
            tracing::warn!(
                key = %self.key,
                dropped = total - unique.len(),
                "Dropped threads with duplicate ids"
            );
        }

        Ok(unique)
    }

    /// Load the thread list; unreadable or malformed storage is an empty list
    pub async fn load(&self) -> Vec<Thread> {
        match self.try_load().await {
            Ok(threads) => {
                tracing::debug!(key = %self.key, count = threads.len(), "Loaded thread snapshot");
                threads
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Ignoring unreadable thread snapshot");
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with `threads`
    pub async fn save(&self, threads: &[Thread]) -> Result<()> {
        let json = serde_json::to_string(threads)?;
        self.backend.set(&self.key, &json).await?;
        tracing::debug!(key = %self.key, count = threads.len(), "Saved thread snapshot");
        Ok(())
    }

    /// Remove the snapshot entirely
    pub async fn clear(&self) -> Result<()> {
        self.backend.remove(&self.key).await
    }
}
