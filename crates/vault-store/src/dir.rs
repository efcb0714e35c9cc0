//! Directory-backed engine: one file per record.
//!
//! Layout under the root directory:
//!
//! ```text
//! VERSION              persisted schema version (decimal)
//! <keyspace>/<hex>     one record; the file name is the hex-encoded key
//! ```
//!
//! Writes go to `<hex>.tmp` and are renamed into place, so a record is either
//! the old value or the new one, never a partial file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::schema::{MigrationStep, Schema};
use crate::traits::KvEngine;

const VERSION_FILE: &str = "VERSION";
const TMP_SUFFIX: &str = ".tmp";

/// Engine storing each record as a file in a keyspace directory.
#[derive(Debug)]
pub struct DirEngine {
    dir: PathBuf,
}

impl DirEngine {
    /// Open (or create) the engine rooted at `root`, upgrading it to
    /// `schema.version` first if needed.
    pub async fn open(root: &Path, schema: &Schema) -> StoreResult<Self> {
        fs::create_dir_all(root).await?;

        let version_path = root.join(VERSION_FILE);
        let current = read_version(&version_path).await?;
        if current > schema.version {
            return Err(StoreError::EngineUnavailable(format!(
                "persisted schema version {current} is newer than supported version {}",
                schema.version
            )));
        }

        let steps = schema.migrations(current);
        for step in &steps {
            apply_step(root, step).await?;
        }
        if current < schema.version {
            write_atomic(&version_path, schema.version.to_string().as_bytes()).await?;
            info!(
                db = %schema.name,
                from = current,
                to = schema.version,
                steps = steps.len(),
                "upgraded storage schema"
            );
        }

        let dir = root.join(&schema.keyspace);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Self { dir }),
            _ => Err(StoreError::EngineUnavailable(format!(
                "keyspace {} missing under {}",
                schema.keyspace,
                root.display()
            ))),
        }
    }

    /// Directory holding this engine's records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(key.as_bytes()))
    }
}

async fn read_version(path: &Path) -> StoreResult<u32> {
    match fs::read_to_string(path).await {
        Ok(text) => text.trim().parse::<u32>().map_err(|e| {
            StoreError::EngineUnavailable(format!("unreadable schema version: {e}"))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn apply_step(root: &Path, step: &MigrationStep) -> StoreResult<()> {
    let dir = root.join(step.keyspace());
    match step {
        MigrationStep::CreateKeyspace(_) => match fs::create_dir(&dir).await {
            Ok(()) => {}
            // Left behind by an upgrade that died before VERSION was written.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!(keyspace = step.keyspace(), "keyspace already exists");
            }
            Err(e) => return Err(e.into()),
        },
        MigrationStep::EnsureKeyspace(_) => fs::create_dir_all(&dir).await?,
    }
    debug!(?step, "applied migration step");
    Ok(())
}

async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn decode_file_name(file_name: &str) -> Option<String> {
    let raw = hex::decode(file_name).ok()?;
    String::from_utf8(raw).ok()
}

#[async_trait]
impl KvEngine for DirEngine {
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        match fs::read(self.record_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        write_atomic(&self.record_path(key), &value).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            // Temp files and anything foreign are not records.
            if let Some(key) = decode_file_name(file_name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(fs::try_exists(self.record_path(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{files_schema, FILES_KEYSPACE};

    async fn open_temp() -> (tempfile::TempDir, DirEngine) {
        let tmp = tempfile::tempdir().unwrap();
        let engine = DirEngine::open(tmp.path(), &files_schema()).await.unwrap();
        (tmp, engine)
    }

    // -----------------------------------------------------------------------
    // Open / upgrade
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn open_fresh_writes_version_and_keyspace() {
        let (tmp, engine) = open_temp().await;
        let version = std::fs::read_to_string(tmp.path().join("VERSION")).unwrap();
        assert_eq!(version, "2");
        assert_eq!(engine.dir(), tmp.path().join(FILES_KEYSPACE));
        assert!(engine.dir().is_dir());
    }

    #[tokio::test]
    async fn open_from_version_one_keeps_records() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(FILES_KEYSPACE)).unwrap();
        std::fs::write(tmp.path().join("VERSION"), "1").unwrap();
        std::fs::write(
            tmp.path().join(FILES_KEYSPACE).join(hex::encode("old.sv")),
            b"kept",
        )
        .unwrap();

        let engine = DirEngine::open(tmp.path(), &files_schema()).await.unwrap();
        assert_eq!(engine.get("old.sv").await.unwrap().unwrap(), &b"kept"[..]);
        let version = std::fs::read_to_string(tmp.path().join("VERSION")).unwrap();
        assert_eq!(version, "2");
    }

    #[tokio::test]
    async fn open_from_version_one_without_keyspace_creates_it() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("VERSION"), "1").unwrap();
        let engine = DirEngine::open(tmp.path(), &files_schema()).await.unwrap();
        assert!(engine.dir().is_dir());
    }

    #[tokio::test]
    async fn newer_version_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("VERSION"), "9").unwrap();
        let err = DirEngine::open(tmp.path(), &files_schema()).await.unwrap_err();
        assert!(matches!(err, StoreError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn garbage_version_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("VERSION"), "two").unwrap();
        let err = DirEngine::open(tmp.path(), &files_schema()).await.unwrap_err();
        assert!(matches!(err, StoreError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn reopen_sees_previous_records() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let engine = DirEngine::open(tmp.path(), &files_schema()).await.unwrap();
            engine.put("hero.sv", Bytes::from_static(b"save")).await.unwrap();
        }
        let engine = DirEngine::open(tmp.path(), &files_schema()).await.unwrap();
        assert_eq!(engine.keys().await.unwrap(), vec!["hero.sv"]);
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_get_delete() {
        let (_tmp, engine) = open_temp().await;
        engine.put("a_chunk_0", Bytes::from_static(b"x")).await.unwrap();
        assert!(engine.contains("a_chunk_0").await.unwrap());
        engine.delete("a_chunk_0").await.unwrap();
        assert!(engine.get("a_chunk_0").await.unwrap().is_none());
        engine.delete("a_chunk_0").await.unwrap();
    }

    #[tokio::test]
    async fn keys_skip_temp_files() {
        let (_tmp, engine) = open_temp().await;
        engine.put("b", Bytes::new()).await.unwrap();
        engine.put("a", Bytes::new()).await.unwrap();
        std::fs::write(engine.dir().join("61.tmp"), b"partial").unwrap();
        assert_eq!(engine.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (_tmp, engine) = open_temp().await;
        engine.put("a", Bytes::from_static(b"1")).await.unwrap();
        engine.clear().await.unwrap();
        engine.clear().await.unwrap();
        assert!(engine.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn longest_chunk_key_fits_a_file_name() {
        let (_tmp, engine) = open_temp().await;
        let name = crate::key::BlobName::new(&"n".repeat(crate::key::MAX_NAME_LEN)).unwrap();
        let key = crate::key::StoreKey::chunk(&name, u32::MAX).encode();
        engine.put(&key, Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(engine.get(&key).await.unwrap().unwrap(), &b"x"[..]);
    }
}
