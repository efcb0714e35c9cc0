use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use vault_store::{BlobName, ChunkStore, StoreError};

use crate::config::FsConfig;
use crate::error::FsResult;
use crate::export::ExportSink;
use crate::facade::FileSystem;
use crate::index::BlobIndex;
use crate::locks::NameLocks;
use crate::url::ObjectUrl;

/// File system persisted through a [`ChunkStore`] and mirrored in a
/// [`BlobIndex`].
///
/// Mutations of one name are serialized, and `clear` waits for every other
/// mutation to finish. The mirror changes only after the durable write
/// succeeded; when a write fails part way the entry is re-read from the store.
pub struct BackedFileSystem {
    chunks: ChunkStore,
    index: BlobIndex,
    config: FsConfig,
    exports: Arc<dyn ExportSink>,
    names: NameLocks,
    clearing: RwLock<()>,
}

impl BackedFileSystem {
    /// Build the file system and hydrate its mirror from the store.
    pub async fn hydrate(
        chunks: ChunkStore,
        config: FsConfig,
        exports: Arc<dyn ExportSink>,
    ) -> FsResult<Self> {
        let index = BlobIndex::hydrate(&chunks).await?;
        info!(blobs = index.len(), "opened blob store");
        Ok(Self {
            chunks,
            index,
            config,
            exports,
            names: NameLocks::new(),
            clearing: RwLock::new(()),
        })
    }

    /// The durable store behind the mirror.
    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Bring the mirror entry for `name` back in line with the store after
    /// a mutation failed part way through.
    async fn resync(&self, name: &BlobName) {
        match self.chunks.read(name.as_str()).await {
            Ok(data) => self.index.set(name, data),
            Err(e) => {
                if !e.is_not_found() {
                    warn!(%name, error = %e, "dropping unreadable blob from mirror");
                }
                self.index.remove(name);
            }
        }
    }
}

#[async_trait]
impl FileSystem for BackedFileSystem {
    fn is_degraded(&self) -> bool {
        false
    }

    fn get(&self, name: &str) -> Option<Bytes> {
        self.index.get(name)
    }

    fn names(&self) -> Vec<String> {
        self.index.names()
    }

    async fn read(&self, name: &str) -> FsResult<Option<Bytes>> {
        match self.chunks.read(name).await {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, name: &str, data: Bytes) -> FsResult<()> {
        let name = BlobName::new(name)?;
        let _clearing = self.clearing.read().await;
        let _guard = self.names.lock(name.as_str()).await;

        if let Err(e) = self.chunks.write(name.as_str(), data.clone()).await {
            self.resync(&name).await;
            return Err(e.into());
        }
        debug!(%name, len = data.len(), "updated blob");
        self.index.set(&name, data);
        Ok(())
    }

    async fn delete(&self, name: &str) -> FsResult<()> {
        let name = BlobName::new(name)?;
        let _clearing = self.clearing.read().await;
        let _guard = self.names.lock(name.as_str()).await;

        if let Err(e) = self.chunks.delete(name.as_str()).await {
            self.resync(&name).await;
            return Err(e.into());
        }
        debug!(%name, "deleted blob");
        self.index.remove(&name);
        Ok(())
    }

    async fn clear(&self) -> FsResult<()> {
        let _clearing = self.clearing.write().await;
        self.chunks.clear().await?;
        self.index.clear();
        info!("cleared blob store");
        Ok(())
    }

    async fn download(&self, name: &str) {
        let data = match self.chunks.read(name).await {
            Ok(data) => data,
            Err(StoreError::NotFound(_)) => {
                error!(name, "cannot export file: it does not exist");
                return;
            }
            Err(e) => {
                error!(name, error = %e, "failed to read file for export");
                return;
            }
        };
        match self.exports.save(name, data).await {
            Ok(()) => info!(name, "exported file"),
            Err(e) => error!(name, error = %e, "failed to export file"),
        }
    }

    async fn download_saves(&self) {
        let names = match self.chunks.names().await {
            Ok(names) => names,
            Err(e) => {
                error!(error = %e, "failed to list saves for export");
                return;
            }
        };
        for name in names.iter().filter(|n| n.has_suffix(&self.config.save_suffix)) {
            self.download(name.as_str()).await;
        }
    }

    async fn file_url(&self, name: &str) -> Option<ObjectUrl> {
        let data = self.index.get(name)?;
        match ObjectUrl::create(&name.to_lowercase(), data).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(name, error = %e, "failed to create file URL");
                None
            }
        }
    }
}

impl std::fmt::Debug for BackedFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackedFileSystem")
            .field("chunks", &self.chunks)
            .field("index", &self.index)
            .field("config", &self.config)
            .finish()
    }
}
