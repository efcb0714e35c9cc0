use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use crate::traits::KvEngine;

/// In-memory, `BTreeMap`-based engine.
///
/// Intended for tests and embedding. Records are held behind a `RwLock`;
/// values are reference-counted `Bytes`, so reads do not copy.
///
/// A put budget can be set to make the engine reject writes after a number
/// of successful puts, which simulates quota exhaustion mid-write. A single
/// key can also be marked undeletable to simulate a failing cleanup.
pub struct InMemoryEngine {
    records: RwLock<BTreeMap<String, Bytes>>,
    put_budget: AtomicUsize,
    undeletable: Option<String>,
}

impl InMemoryEngine {
    /// Create a new empty engine with no put budget.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            put_budget: AtomicUsize::new(usize::MAX),
            undeletable: None,
        }
    }

    /// Open a fresh engine for `schema`.
    ///
    /// A memory engine always starts at version 0, so every migration step
    /// runs; they only need validating since there is a single keyspace.
    pub fn open(schema: &Schema) -> StoreResult<Self> {
        for step in schema.migrations(0) {
            if step.keyspace() != schema.keyspace {
                return Err(StoreError::EngineUnavailable(format!(
                    "unknown keyspace in migration: {}",
                    step.keyspace()
                )));
            }
            debug!(?step, "applied migration step");
        }
        Ok(Self::new())
    }

    /// Allow only `puts` more successful puts; later puts are rejected.
    pub fn with_put_budget(self, puts: usize) -> Self {
        self.put_budget.store(puts, Ordering::SeqCst);
        self
    }

    /// Make every delete of `key` fail with an I/O error.
    pub fn with_failing_delete(mut self, key: impl Into<String>) -> Self {
        self.undeletable = Some(key.into());
        self
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the engine holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    fn take_put_permit(&self) -> bool {
        self.put_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvEngine for InMemoryEngine {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        if !self.take_put_permit() {
            return Err(StoreError::WriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".into(),
            });
        }
        let mut map = self.records.write().expect("lock poisoned");
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        if self.undeletable.as_deref() == Some(key) {
            return Err(std::io::Error::other(format!("cannot delete {key}")).into());
        }
        let mut map = self.records.write().expect("lock poisoned");
        map.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.write().expect("lock poisoned").clear();
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }

    async fn contains(&self, key: &str) -> StoreResult<bool> {
        let map = self.records.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEngine")
            .field("record_count", &self.len())
            .finish()
    }
}
