use std::path::PathBuf;
use std::sync::Arc;

use crate::dbs::{FileStorage, MemoryStorage};
use crate::error::{PersistError, Result};
use crate::repositories::{ThreadRepository, DEFAULT_HISTORY_KEY};
use crate::trait_client::StorageBackend;

/// Builder for a [`ThreadRepository`] over a file, memory or custom backend
pub struct ThreadRepositoryBuilder {
    storage_dir: Option<PathBuf>,
    backend: Option<Arc<dyn StorageBackend>>,
    in_memory: bool,
    key: String,
}

impl ThreadRepositoryBuilder {
    pub fn new() -> Self {
        Self {
            storage_dir: None,
            backend: None,
            in_memory: false,
            key: DEFAULT_HISTORY_KEY.to_string(),
        }
    }

    /// Persist under this directory
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Keep everything in memory (nothing survives the process)
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Use a caller-provided backend
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn build(self) -> Result<ThreadRepository> {
        if self.key.trim().is_empty() {
            return Err(PersistError::InvalidKey(self.key));
        }

        let backend: Arc<dyn StorageBackend> = match (self.backend, self.storage_dir, self.in_memory) {
            (Some(backend), _, _) => backend,
            (None, _, true) => Arc::new(MemoryStorage::new()),
            (None, Some(dir), false) => Arc::new(FileStorage::new(dir)),
            (None, None, false) => {
                return Err(PersistError::Internal(
                    "storage_dir, in_memory or backend is required".to_string(),
                ))
            }
        };

        Ok(ThreadRepository::with_key(backend, self.key))
    }
}

impl Default for ThreadRepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
