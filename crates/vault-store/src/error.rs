/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The persistence engine could not be opened or upgraded.
    #[error("storage engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No blob is stored under this name.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The metadata record exists but the chunk set is incomplete or unreadable.
    #[error("corrupt blob {name}: {reason}")]
    CorruptBlob { name: String, reason: String },

    /// The name cannot be used as a logical blob name.
    #[error("invalid blob name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The blob needs more chunk records than the metadata can describe.
    #[error("blob of {len} bytes needs too many chunks of {chunk_size} bytes")]
    TooManyChunks { len: usize, chunk_size: usize },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The engine refused the write (e.g. quota exhausted).
    #[error("write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` if this error means the blob does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
