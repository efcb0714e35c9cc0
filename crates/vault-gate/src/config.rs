use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GateError, GateResult};
use crate::sizes::KnownSizes;

/// Configuration for acquiring the reference asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Name the asset is stored under.
    pub asset_name: String,
    /// Origin the asset is fetched from; the asset name is resolved against it.
    pub base_url: String,
    /// Accepted asset lengths; exactly three.
    pub known_sizes: Vec<u64>,
    /// Total reported in progress when the origin sends no content length.
    pub default_total: u64,
    /// `Cache-Control` header sent with the request.
    pub cache_control: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            asset_name: "diabdat.mpq".into(),
            base_url: "http://127.0.0.1:8080/".into(),
            known_sizes: vec![517_501_282, 263_402_726, 263_383_766],
            default_total: 263_402_726,
            cache_control: "max-age=31536000".into(),
        }
    }
}

impl GateConfig {
    /// Full URL of the asset.
    pub fn asset_url(&self) -> GateResult<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| GateError::Config(format!("invalid base URL {}: {e}", self.base_url)))?;
        base.join(&self.asset_name)
            .map_err(|e| GateError::Config(format!("invalid asset name {}: {e}", self.asset_name)))
    }

    pub fn sizes(&self) -> GateResult<KnownSizes> {
        KnownSizes::try_from(self.known_sizes.as_slice())
    }
}
