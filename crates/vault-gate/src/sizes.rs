use std::fmt;

use crate::error::{GateError, GateResult};

/// The three byte lengths the reference asset is accepted at.
///
/// Any other length is treated as corruption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownSizes([u64; 3]);

impl KnownSizes {
    pub const fn new(sizes: [u64; 3]) -> Self {
        Self(sizes)
    }

    pub fn contains(&self, len: u64) -> bool {
        self.0.contains(&len)
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

impl TryFrom<&[u64]> for KnownSizes {
    type Error = GateError;

    fn try_from(sizes: &[u64]) -> GateResult<Self> {
        let sizes: [u64; 3] = sizes.try_into().map_err(|_| {
            GateError::Config(format!(
                "expected exactly 3 known asset sizes, got {}",
                sizes.len()
            ))
        })?;
        Ok(Self(sizes))
    }
}

impl fmt::Display for KnownSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.0[0], self.0[1], self.0[2])
    }
}
