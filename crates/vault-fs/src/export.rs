//! Destinations for user-initiated exports.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::error::{FsError, FsResult};

/// Where exported blobs are handed over to the user.
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Deliver `data` under the file name `name`.
    async fn save(&self, name: &str, data: Bytes) -> FsResult<()>;
}

/// Writes exported blobs as files into a directory.
#[derive(Clone, Debug)]
pub struct DirectoryExport {
    dir: PathBuf,
}

impl DirectoryExport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for DirectoryExport {
    async fn save(&self, name: &str, data: Bytes) -> FsResult<()> {
        let export_err = |reason: String| FsError::Export {
            name: name.to_string(),
            reason,
        };
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| export_err("name has no file component".into()))?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| export_err(e.to_string()))?;
        fs::write(self.dir.join(file_name), &data)
            .await
            .map_err(|e| export_err(e.to_string()))
    }
}
