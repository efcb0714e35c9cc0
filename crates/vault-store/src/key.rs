//! Logical blob names and the tagged engine key scheme.
//!
//! Every engine key is built by [`StoreKey::encode`] and classified by
//! [`StoreKey::decode`]; no other code concatenates key strings.

use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Suffix of the metadata record key.
pub const METADATA_SUFFIX: &str = "_metadata";

/// Separator between the blob name and the chunk index in a chunk key.
pub const CHUNK_INFIX: &str = "_chunk_";

/// Longest accepted blob name, in bytes.
///
/// The directory engine hex-encodes keys into file names, so the longest
/// chunk key of such a name plus its temp suffix stays under the usual
/// 255-byte file name limit.
pub const MAX_NAME_LEN: usize = 100;

// ---------------------------------------------------------------------------
// BlobName
// ---------------------------------------------------------------------------

/// Canonical (lowercased) name of a logical blob.
///
/// Names that would be mistaken for a metadata or chunk key are rejected so
/// that key decoding is never ambiguous.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    /// Normalize and validate a user-supplied name.
    pub fn new(name: &str) -> StoreResult<Self> {
        let normalized = name.to_lowercase();
        if normalized.is_empty() {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "name is empty".into(),
            });
        }
        if normalized.len() > MAX_NAME_LEN {
            return Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: format!("longer than {MAX_NAME_LEN} bytes"),
            });
        }
        match StoreKey::decode(&normalized) {
            StoreKey::Plain(_) => Ok(Self(normalized)),
            StoreKey::Metadata(_) | StoreKey::Chunk(..) => Err(StoreError::InvalidName {
                name: name.to_string(),
                reason: "collides with the chunk record key scheme".into(),
            }),
        }
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name ends with `suffix`, ignoring case.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.0.ends_with(&suffix.to_lowercase())
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// StoreKey
// ---------------------------------------------------------------------------

/// A key in the underlying engine, tagged by the record it addresses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Whole blob stored in a single record.
    Plain(String),
    /// Commit marker of a chunked blob.
    Metadata(String),
    /// One slice of a chunked blob, zero-based.
    Chunk(String, u32),
}

impl StoreKey {
    pub fn plain(name: &BlobName) -> Self {
        Self::Plain(name.as_str().to_string())
    }

    pub fn metadata(name: &BlobName) -> Self {
        Self::Metadata(name.as_str().to_string())
    }

    pub fn chunk(name: &BlobName, index: u32) -> Self {
        Self::Chunk(name.as_str().to_string(), index)
    }

    /// Render the engine key string.
    pub fn encode(&self) -> String {
        match self {
            Self::Plain(name) => name.clone(),
            Self::Metadata(name) => format!("{name}{METADATA_SUFFIX}"),
            Self::Chunk(name, index) => format!("{name}{CHUNK_INFIX}{index}"),
        }
    }

    /// Classify an engine key.
    ///
    /// A key ending in `_metadata` is a metadata key; a key ending in
    /// `_chunk_<digits>` is a chunk key; anything else is plain.
    pub fn decode(key: &str) -> Self {
        if let Some(name) = key.strip_suffix(METADATA_SUFFIX) {
            if !name.is_empty() {
                return Self::Metadata(name.to_string());
            }
        }
        if let Some(pos) = key.rfind(CHUNK_INFIX) {
            let name = &key[..pos];
            let digits = &key[pos + CHUNK_INFIX.len()..];
            if !name.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(index) = digits.parse::<u32>() {
                    return Self::Chunk(name.to_string(), index);
                }
            }
        }
        Self::Plain(key.to_string())
    }

    /// The logical blob name this key belongs to.
    pub fn blob_name(&self) -> &str {
        match self {
            Self::Plain(name) | Self::Metadata(name) | Self::Chunk(name, _) => name,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
