use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::progress::{Progress, ProgressSink};

/// Largest buffer reserved up front from an advertised content length.
const MAX_PREALLOC: u64 = 1024 * 1024 * 1024;

/// Where the reference asset is fetched from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;

    /// Fetch the whole asset, reporting progress as bytes arrive.
    async fn fetch(&self, progress: &dyn ProgressSink) -> GateResult<Bytes>;
}

/// Fetches the asset with a single whole-file HTTP GET.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: Client,
    url: Url,
    cache_control: String,
    default_total: u64,
}

impl HttpSource {
    pub fn new(url: Url, cache_control: impl Into<String>, default_total: u64) -> Self {
        Self {
            client: Client::new(),
            url,
            cache_control: cache_control.into(),
            default_total,
        }
    }

    pub fn from_config(config: &GateConfig) -> GateResult<Self> {
        Ok(Self::new(
            config.asset_url()?,
            config.cache_control.clone(),
            config.default_total,
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self, progress: &dyn ProgressSink) -> GateResult<Bytes> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(CACHE_CONTROL, &self.cache_control)
            .send()
            .await
            .map_err(|e| GateError::Fetch(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GateError::HttpStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let total = resp.content_length().unwrap_or(self.default_total);
        info!(url = %self.url, total, "downloading asset");

        let mut body = BytesMut::with_capacity(total.min(MAX_PREALLOC) as usize);
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| GateError::Fetch(e.to_string()))?;
            body.extend_from_slice(&chunk);
            progress.report(Progress::downloading(body.len() as u64, total));
        }
        debug!(url = %self.url, len = body.len(), "download finished");
        Ok(body.freeze())
    }
}
