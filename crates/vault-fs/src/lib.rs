//! File system facade for the vault.
//!
//! Composes the chunked [`vault_store::ChunkStore`] with an in-memory
//! [`BlobIndex`] so lookups never wait on the engine, and exposes exports to
//! the host through an injected [`ExportSink`].
//!
//! [`open_file_system`] is the entry point: it opens the engine, hydrates the
//! mirror, and falls back to a [`DegradedFileSystem`] if storage cannot be
//! used. Callers hold an `Arc<dyn FileSystem>` either way.

pub mod backed;
pub mod config;
pub mod degraded;
pub mod error;
pub mod export;
pub mod facade;
pub mod index;
pub mod locks;
pub mod url;

pub use backed::BackedFileSystem;
pub use config::FsConfig;
pub use degraded::DegradedFileSystem;
pub use error::{FsError, FsResult};
pub use export::{DirectoryExport, ExportSink};
pub use facade::FileSystem;
pub use index::BlobIndex;
pub use locks::NameLocks;
pub use url::ObjectUrl;

use std::sync::Arc;

use tracing::error;
use vault_store::{files_schema, ChunkStore, KvEngine, StoreConfig, StoreResult};

/// Open the persistent file system described by `store`.
///
/// Never fails: if the engine cannot be opened or hydrated, a degraded file
/// system is returned instead and the cause is logged.
pub async fn open_file_system(
    store: &StoreConfig,
    config: FsConfig,
    exports: Arc<dyn ExportSink>,
) -> Arc<dyn FileSystem> {
    let engine = vault_store::open_engine(store, &files_schema()).await;
    from_engine(engine, store.chunk_size, config, exports).await
}

/// Build a file system from the outcome of opening an engine.
pub async fn from_engine(
    engine: StoreResult<Arc<dyn KvEngine>>,
    chunk_size: usize,
    config: FsConfig,
    exports: Arc<dyn ExportSink>,
) -> Arc<dyn FileSystem> {
    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "storage unavailable, running without persistence");
            return Arc::new(DegradedFileSystem::new());
        }
    };
    let chunks = ChunkStore::with_chunk_size(engine, chunk_size);
    match BackedFileSystem::hydrate(chunks, config, exports).await {
        Ok(fs) => Arc::new(fs),
        Err(e) => {
            error!(error = %e, "failed to load stored files, running without persistence");
            Arc::new(DegradedFileSystem::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use vault_store::{InMemoryEngine, StoreError};

    fn exports(dir: &std::path::Path) -> Arc<dyn ExportSink> {
        Arc::new(DirectoryExport::new(dir))
    }

    #[tokio::test]
    async fn unavailable_engine_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = from_engine(
            Err(StoreError::EngineUnavailable("no engine".into())),
            4,
            FsConfig::default(),
            exports(tmp.path()),
        )
        .await;
        assert!(fs.is_degraded());
        fs.update("a.sv", Bytes::from_static(b"x")).await.unwrap();
        fs.delete("a.sv").await.unwrap();
        assert!(fs.get("a.sv").is_none());
        assert!(fs.read("a.sv").await.unwrap().is_none());
        assert!(fs.file_url("a.sv").await.is_none());
    }

    #[tokio::test]
    async fn memory_engine_is_backed() {
        let tmp = tempfile::tempdir().unwrap();
        let engine: Arc<dyn KvEngine> = Arc::new(InMemoryEngine::new());
        let fs = from_engine(Ok(engine), 4, FsConfig::default(), exports(tmp.path())).await;
        assert!(!fs.is_degraded());
    }

    #[tokio::test]
    async fn open_on_directory_persists_across_opens() {
        let tmp = tempfile::tempdir().unwrap();
        let store = StoreConfig {
            root: tmp.path().join("store"),
            chunk_size: 4,
        };
        let out = tmp.path().join("out");

        let fs = open_file_system(&store, FsConfig::default(), exports(&out)).await;
        assert!(!fs.is_degraded());
        fs.update("Hero.sv", Bytes::from_static(b"0123456789")).await.unwrap();
        drop(fs);

        let fs = open_file_system(&store, FsConfig::default(), exports(&out)).await;
        assert_eq!(fs.get("hero.sv").unwrap(), &b"0123456789"[..]);
        fs.download_saves().await;
        assert_eq!(std::fs::read(out.join("hero.sv")).unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn unusable_root_degrades() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"occupied").unwrap();
        let store = StoreConfig {
            root: file,
            chunk_size: 4,
        };
        let fs = open_file_system(&store, FsConfig::default(), exports(tmp.path())).await;
        assert!(fs.is_degraded());
    }
}
