use crate::error::ClientResult;
use async_trait::async_trait;

/// Abstraction over persisted key-value storage so the session can be tested
/// without touching the filesystem
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written
    async fn get(&self, key: &str) -> ClientResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> ClientResult<()>;

    /// Write several entries at once; either all of them land or none do
    async fn set_many(&self, entries: &[(&str, &str)]) -> ClientResult<()>;

    /// Remove a key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> ClientResult<()>;

    /// Remove several keys in one write
    async fn remove_many(&self, keys: &[&str]) -> ClientResult<()>;
}
