use std::collections::BTreeSet;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{StoreError, StoreResult};
use crate::key::{BlobName, StoreKey};
use crate::traits::KvEngine;

/// Value of a metadata record: how many chunk records make up the blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chunks: u32,
}

impl ChunkMetadata {
    fn encode(&self) -> StoreResult<Bytes> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(name: &BlobName, raw: &[u8]) -> StoreResult<Self> {
        let meta: Self = serde_json::from_slice(raw).map_err(|e| StoreError::CorruptBlob {
            name: name.to_string(),
            reason: format!("unreadable metadata: {e}"),
        })?;
        if meta.chunks == 0 {
            return Err(StoreError::CorruptBlob {
                name: name.to_string(),
                reason: "metadata declares zero chunks".into(),
            });
        }
        Ok(meta)
    }
}

/// Stores logical blobs in a [`KvEngine`], splitting large ones into chunks.
///
/// The store holds no cache and takes no locks. Two writers racing on the same
/// name can interleave their chunk records; callers must serialize them.
#[derive(Clone)]
pub struct ChunkStore {
    engine: Arc<dyn KvEngine>,
    chunk_size: usize,
}

impl ChunkStore {
    /// Create a store with the default 5 MiB chunk size.
    pub fn new(engine: Arc<dyn KvEngine>) -> Self {
        Self::with_chunk_size(engine, DEFAULT_CHUNK_SIZE)
    }

    /// Create a store with a custom chunk size (at least one byte).
    pub fn with_chunk_size(engine: Arc<dyn KvEngine>, chunk_size: usize) -> Self {
        Self {
            engine,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<dyn KvEngine> {
        &self.engine
    }

    /// Number of chunk records a blob of `len` bytes needs.
    ///
    /// Returns 0 for blobs stored plain, and [`StoreError::TooManyChunks`]
    /// when the count does not fit the metadata record.
    pub fn chunk_count(&self, len: usize) -> StoreResult<u32> {
        if len <= self.chunk_size {
            return Ok(0);
        }
        u32::try_from(len.div_ceil(self.chunk_size)).map_err(|_| StoreError::TooManyChunks {
            len,
            chunk_size: self.chunk_size,
        })
    }

    // -----------------------------------------------------------------------
    // Write
    // -----------------------------------------------------------------------

    /// Store `data` under `name`, replacing any previous blob of that name.
    ///
    /// Blobs up to the chunk size are written as one plain record. Larger
    /// blobs are written chunk by chunk with the metadata record last; until
    /// it lands the new blob does not exist. Records left from the previous
    /// form of the blob are removed afterwards.
    pub async fn write(&self, name: &str, data: Bytes) -> StoreResult<()> {
        let name = BlobName::new(name)?;
        let previous = self.chunk_extent(&name).await?;

        if data.len() <= self.chunk_size {
            self.engine.put(&StoreKey::plain(&name).encode(), data).await?;
            if let Some(count) = previous {
                self.drop_chunked(&name, 0, count).await?;
            }
            debug!(%name, "stored blob without chunking");
            return Ok(());
        }

        let count = self.chunk_count(data.len())?;
        if previous.is_some() {
            self.engine.delete(&StoreKey::metadata(&name).encode()).await?;
        }
        for index in 0..count {
            let start = index as usize * self.chunk_size;
            let end = (start + self.chunk_size).min(data.len());
            self.engine
                .put(&StoreKey::chunk(&name, index).encode(), data.slice(start..end))
                .await?;
        }
        let meta = ChunkMetadata { chunks: count }.encode()?;
        self.engine.put(&StoreKey::metadata(&name).encode(), meta).await?;

        self.engine.delete(&StoreKey::plain(&name).encode()).await?;
        if let Some(old) = previous {
            for index in count..old {
                self.engine.delete(&StoreKey::chunk(&name, index).encode()).await?;
            }
        }
        debug!(%name, chunks = count, "stored blob in chunks");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Reassemble the blob stored under `name`.
    ///
    /// Returns [`StoreError::NotFound`] if no blob exists and
    /// [`StoreError::CorruptBlob`] if the metadata names a chunk that is gone.
    pub async fn read(&self, name: &str) -> StoreResult<Bytes> {
        let name = BlobName::new(name)?;
        let Some(raw) = self.engine.get(&StoreKey::metadata(&name).encode()).await? else {
            return self
                .engine
                .get(&StoreKey::plain(&name).encode())
                .await?
                .ok_or_else(|| StoreError::NotFound(name.to_string()));
        };

        let meta = ChunkMetadata::decode(&name, &raw)?;
        let mut parts = Vec::with_capacity(meta.chunks as usize);
        for index in 0..meta.chunks {
            let chunk = self
                .engine
                .get(&StoreKey::chunk(&name, index).encode())
                .await?
                .ok_or_else(|| StoreError::CorruptBlob {
                    name: name.to_string(),
                    reason: format!("chunk {index} of {} is missing", meta.chunks),
                })?;
            parts.push(chunk);
        }

        let total = parts.iter().map(Bytes::len).sum();
        let mut data = BytesMut::with_capacity(total);
        for part in &parts {
            data.extend_from_slice(part);
        }
        Ok(data.freeze())
    }

    /// Returns `true` if a blob (plain or committed chunked) exists.
    pub async fn exists(&self, name: &str) -> StoreResult<bool> {
        let name = BlobName::new(name)?;
        Ok(self.engine.contains(&StoreKey::metadata(&name).encode()).await?
            || self.engine.contains(&StoreKey::plain(&name).encode()).await?)
    }

    // -----------------------------------------------------------------------
    // Delete / clear
    // -----------------------------------------------------------------------

    /// Remove the blob stored under `name`. Missing blobs are a no-op.
    pub async fn delete(&self, name: &str) -> StoreResult<()> {
        let name = BlobName::new(name)?;
        match self.chunk_extent(&name).await? {
            Some(count) => self.drop_chunked(&name, 0, count).await?,
            None => self.engine.delete(&StoreKey::plain(&name).encode()).await?,
        }
        Ok(())
    }

    /// Remove every record in the engine, including orphaned chunks.
    pub async fn clear(&self) -> StoreResult<()> {
        self.engine.clear().await
    }

    /// Logical names of every stored blob, sorted.
    ///
    /// Plain records and metadata records name blobs; chunk records without
    /// a metadata record are orphans and are not listed.
    pub async fn names(&self) -> StoreResult<Vec<BlobName>> {
        let mut names = BTreeSet::new();
        for key in self.engine.keys().await? {
            let decoded = StoreKey::decode(&key);
            if let StoreKey::Chunk(..) = decoded {
                continue;
            }
            match BlobName::new(decoded.blob_name()) {
                Ok(name) if name.as_str() == decoded.blob_name() => {
                    names.insert(name);
                }
                _ => warn!(key = %key, "ignoring record with a non-canonical key"),
            }
        }
        Ok(names.into_iter().collect())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// How many chunk records the current chunked form of `name` spans, or
    /// `None` if it is not stored chunked.
    ///
    /// When the metadata record cannot be decoded the chunk keys are scanned
    /// instead, so cleanup still finds every chunk.
    async fn chunk_extent(&self, name: &BlobName) -> StoreResult<Option<u32>> {
        let Some(raw) = self.engine.get(&StoreKey::metadata(name).encode()).await? else {
            return Ok(None);
        };
        match ChunkMetadata::decode(name, &raw) {
            Ok(meta) => Ok(Some(meta.chunks)),
            Err(e) => {
                warn!(%name, error = %e, "scanning for chunks of blob with bad metadata");
                let mut extent = 0;
                for key in self.engine.keys().await? {
                    if let StoreKey::Chunk(owner, index) = StoreKey::decode(&key) {
                        if owner == name.as_str() {
                            extent = extent.max(index + 1);
                        }
                    }
                }
                Ok(Some(extent))
            }
        }
    }

    /// Delete the metadata record, then chunks `from..to`.
    ///
    /// Once the metadata is gone the chunks are orphans, so a failure part
    /// way through never leaves a commit marker pointing at missing chunks.
    async fn drop_chunked(&self, name: &BlobName, from: u32, to: u32) -> StoreResult<()> {
        self.engine.delete(&StoreKey::metadata(name).encode()).await?;
        for index in from..to {
            self.engine.delete(&StoreKey::chunk(name, index).encode()).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
