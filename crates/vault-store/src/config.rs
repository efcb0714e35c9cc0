use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Largest record the store writes: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Configuration for the persistent blob store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the engine's records.
    pub root: PathBuf,
    /// Blobs larger than this are split into chunks of this size.
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".vault"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
