use serde::{Deserialize, Serialize};

/// Configuration for the file system facade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// File name suffix identifying save files, matched case-insensitively.
    pub save_suffix: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            save_suffix: ".sv".into(),
        }
    }
}
