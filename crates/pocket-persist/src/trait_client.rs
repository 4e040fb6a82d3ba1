use async_trait::async_trait;
use crate::error::Result;

/// String-valued key-value storage
///
/// The chat history lives under a single key and is overwritten in full on
/// every write, so implementations only need whole-value semantics.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}
