use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{FsError, FsResult};
use crate::url::ObjectUrl;

/// The file system the rest of the application talks to.
///
/// Every operation normalizes the blob name to lowercase first. There are two
/// implementations, chosen once at start-up: [`crate::BackedFileSystem`]
/// persists through the chunk store, [`crate::DegradedFileSystem`] is used
/// when no engine could be opened and stores nothing.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Returns `true` if writes are discarded because storage is unavailable.
    fn is_degraded(&self) -> bool;

    /// Mirrored bytes for `name`, without I/O.
    fn get(&self, name: &str) -> Option<Bytes>;

    /// Sorted names of every mirrored blob.
    fn names(&self) -> Vec<String>;

    /// Read `name` from durable storage, bypassing the mirror.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    async fn read(&self, name: &str) -> FsResult<Option<Bytes>>;

    /// Store `data` under `name`, replacing any previous blob.
    async fn update(&self, name: &str, data: Bytes) -> FsResult<()>;

    /// Remove `name`. Missing blobs are a no-op.
    async fn delete(&self, name: &str) -> FsResult<()>;

    /// Remove every blob.
    async fn clear(&self) -> FsResult<()>;

    /// Read `reader` to the end and store it under `name`.
    async fn upload(&self, name: &str, reader: &mut (dyn AsyncRead + Send + Unpin)) -> FsResult<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        self.update(name, Bytes::from(data)).await
    }

    /// Upload a local file under its file name.
    async fn upload_path(&self, path: &Path) -> FsResult<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FsError::InvalidUpload(path.display().to_string()))?;
        let mut file = tokio::fs::File::open(path).await?;
        self.upload(name, &mut file).await
    }

    /// Export `name` to the user. Failures are logged, never returned.
    async fn download(&self, name: &str);

    /// Export every save file to the user. Failures are logged, never returned.
    async fn download_saves(&self);

    /// A short-lived URL to the mirrored bytes of `name`, if present.
    async fn file_url(&self, name: &str) -> Option<ObjectUrl>;
}
