use thiserror::Error;

/// Errors that can occur while acquiring the reference asset.
#[derive(Debug, Error)]
pub enum GateError {
    /// The asset's length is not one of the known-good sizes.
    #[error("invalid {name} size ({size} bytes). Try clearing the cache and retrying.")]
    AssetSizeMismatch { name: String, size: u64 },

    /// The transfer failed before the whole asset arrived.
    #[error("failed to fetch asset: {0}")]
    Fetch(String),

    /// The origin answered with a non-success status.
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// Reading or committing the asset through the file system failed.
    #[error("file system error: {0}")]
    Fs(#[from] vault_fs::FsError),

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Returns `true` if the asset on offer is corrupt rather than unreachable.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::AssetSizeMismatch { .. })
    }
}

pub type GateResult<T> = Result<T, GateError>;
