use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;
use tracing::{debug, error};

use crate::error::FsResult;
use crate::facade::FileSystem;
use crate::url::ObjectUrl;

/// File system used when the storage engine is unavailable.
///
/// Mutations succeed without storing anything and every lookup reports the
/// blob as absent, so the application keeps running without persistence.
#[derive(Debug, Default)]
pub struct DegradedFileSystem;

impl DegradedFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for DegradedFileSystem {
    fn is_degraded(&self) -> bool {
        true
    }

    fn get(&self, _name: &str) -> Option<Bytes> {
        None
    }

    fn names(&self) -> Vec<String> {
        Vec::new()
    }

    async fn read(&self, _name: &str) -> FsResult<Option<Bytes>> {
        Ok(None)
    }

    async fn update(&self, name: &str, data: Bytes) -> FsResult<()> {
        debug!(name, len = data.len(), "storage unavailable, discarding write");
        Ok(())
    }

    async fn delete(&self, _name: &str) -> FsResult<()> {
        Ok(())
    }

    async fn clear(&self) -> FsResult<()> {
        Ok(())
    }

    async fn upload(&self, name: &str, _reader: &mut (dyn AsyncRead + Send + Unpin)) -> FsResult<()> {
        debug!(name, "storage unavailable, discarding upload");
        Ok(())
    }

    async fn upload_path(&self, path: &Path) -> FsResult<()> {
        debug!(path = %path.display(), "storage unavailable, discarding upload");
        Ok(())
    }

    async fn download(&self, name: &str) {
        error!(name, "cannot export file: storage is unavailable");
    }

    async fn download_saves(&self) {
        error!("cannot export saves: storage is unavailable");
    }

    async fn file_url(&self, _name: &str) -> Option<ObjectUrl> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mutations_resolve_and_reads_report_absence() {
        let fs = DegradedFileSystem::new();
        assert!(fs.is_degraded());

        fs.update("diabdat.mpq", Bytes::from_static(b"data")).await.unwrap();
        assert!(fs.get("diabdat.mpq").is_none());
        assert!(fs.read("diabdat.mpq").await.unwrap().is_none());
        assert!(fs.file_url("diabdat.mpq").await.is_none());

        fs.delete("diabdat.mpq").await.unwrap();
        fs.clear().await.unwrap();
        assert!(fs.names().is_empty());
    }

    #[tokio::test]
    async fn uploads_are_discarded() {
        let fs = DegradedFileSystem::new();
        let mut reader: &[u8] = b"bytes";
        fs.upload("a.sv", &mut reader).await.unwrap();
        fs.upload_path(Path::new("/does/not/exist.sv")).await.unwrap();
        assert!(fs.get("a.sv").is_none());
    }

    #[tokio::test]
    async fn exports_do_not_panic() {
        let fs = DegradedFileSystem::new();
        fs.download("a.sv").await;
        fs.download_saves().await;
    }
}
