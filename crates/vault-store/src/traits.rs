use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Asynchronous key-value engine holding one keyspace of byte records.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces any existing value under the key.
/// - `delete` of a missing key succeeds and does nothing.
/// - `clear` removes every record; calling it again leaves zero records.
/// - The engine never interprets values — it is a pure byte store.
#[async_trait]
pub trait KvEngine: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Store `value` under `key`.
    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Remove the record under `key`, if any.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Remove every record.
    async fn clear(&self) -> StoreResult<()>;

    /// List every key currently stored.
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Check whether a record exists.
    ///
    /// Default implementation reads the value. Engines may override with a
    /// cheaper existence check.
    async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
