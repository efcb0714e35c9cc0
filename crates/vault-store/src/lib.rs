//! Chunked blob storage for the vault.
//!
//! Named binary blobs are persisted in an asynchronous key-value engine. Blobs
//! larger than the configured chunk size are split into fixed-size chunk
//! records plus a metadata record that acts as the commit marker, so the
//! engine never sees an entry larger than one chunk.
//!
//! # Record Layout
//!
//! - `<name>` -- the whole blob, when it fits in one chunk
//! - `<name>_chunk_<i>` -- the `i`-th slice of a chunked blob
//! - `<name>_metadata` -- `{"chunks": N}`, written after every chunk
//!
//! Keys are built and parsed only through [`StoreKey`].
//!
//! # Engines
//!
//! All engines implement the [`KvEngine`] trait:
//!
//! - [`InMemoryEngine`] -- `BTreeMap`-based engine for tests and embedding
//! - [`DirEngine`] -- one file per record under a directory
//!
//! # Design Rules
//!
//! 1. A blob is stored either plain or chunked, never both.
//! 2. The metadata record is written last; without it a blob does not exist.
//! 3. Names are case-insensitive and normalized to lowercase.
//! 4. The store does not lock. Callers serialize writers per name.

pub mod chunk;
pub mod config;
pub mod dir;
pub mod error;
pub mod key;
pub mod memory;
pub mod schema;
pub mod traits;

pub use chunk::{ChunkMetadata, ChunkStore};
pub use config::{StoreConfig, DEFAULT_CHUNK_SIZE};
pub use dir::DirEngine;
pub use error::{StoreError, StoreResult};
pub use key::{BlobName, StoreKey, MAX_NAME_LEN};
pub use memory::InMemoryEngine;
pub use schema::{files_schema, MigrationStep, Schema, FILES_KEYSPACE};
pub use traits::KvEngine;

use std::sync::Arc;

/// Open the configured persistent engine with the given schema.
///
/// Any failure to open or upgrade the engine is reported as
/// [`StoreError::EngineUnavailable`], which callers treat as a signal to run
/// without persistence.
pub async fn open_engine(config: &StoreConfig, schema: &Schema) -> StoreResult<Arc<dyn KvEngine>> {
    match DirEngine::open(&config.root, schema).await {
        Ok(engine) => Ok(Arc::new(engine)),
        Err(StoreError::EngineUnavailable(reason)) => Err(StoreError::EngineUnavailable(reason)),
        Err(e) => Err(StoreError::EngineUnavailable(e.to_string())),
    }
}
