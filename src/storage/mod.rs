use crate::error::Result;
use async_trait::async_trait;

pub mod gateway;
pub mod memory_storage;
pub mod snapshot;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

/// Durable key-value storage holding the persisted records
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a record, `None` when it was never written
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Creates or replaces a record
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a record; removing a missing record is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Lists the stored keys in ascending order
    async fn keys(&self) -> Result<Vec<String>>;
}
