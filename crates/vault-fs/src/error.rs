use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("store error: {0}")]
    Store(#[from] vault_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot upload {0}: path has no file name")]
    InvalidUpload(String),

    #[error("export of {name} failed: {reason}")]
    Export { name: String, reason: String },
}

pub type FsResult<T> = Result<T, FsError>;
