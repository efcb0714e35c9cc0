//! In-memory mirror of every stored blob.
//!
//! The index is derived data: it can be rebuilt from the engine at any time
//! and is never the system of record. The facade updates it only after the
//! matching durable write has succeeded.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;
use tracing::{debug, warn};
use vault_store::{BlobName, ChunkStore, StoreResult};

/// Mapping from normalized blob name to the reassembled bytes.
pub struct BlobIndex {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl BlobIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Build the index by reading every blob the store lists.
    ///
    /// Blobs that cannot be reassembled are logged and left out; their
    /// records stay in the engine until they are deleted or cleared.
    pub async fn hydrate(chunks: &ChunkStore) -> StoreResult<Self> {
        let index = Self::new();
        for name in chunks.names().await? {
            match chunks.read(name.as_str()).await {
                Ok(data) => index.set(&name, data),
                Err(e) => warn!(%name, error = %e, "skipping unreadable blob"),
            }
        }
        debug!(blobs = index.len(), "hydrated blob index");
        Ok(index)
    }

    /// Look up a blob by name, in any case. Never performs I/O.
    pub fn get(&self, name: &str) -> Option<Bytes> {
        let blobs = self.blobs.read().expect("lock poisoned");
        blobs.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let blobs = self.blobs.read().expect("lock poisoned");
        blobs.contains_key(&name.to_lowercase())
    }

    pub fn set(&self, name: &BlobName, data: Bytes) {
        let mut blobs = self.blobs.write().expect("lock poisoned");
        blobs.insert(name.as_str().to_string(), data);
    }

    pub fn remove(&self, name: &BlobName) {
        let mut blobs = self.blobs.write().expect("lock poisoned");
        blobs.remove(name.as_str());
    }

    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }

    /// Sorted names of all mirrored blobs.
    pub fn names(&self) -> Vec<String> {
        let blobs = self.blobs.read().expect("lock poisoned");
        let mut names: Vec<String> = blobs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for BlobIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlobIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobIndex")
            .field("blob_count", &self.len())
            .finish()
    }
}
