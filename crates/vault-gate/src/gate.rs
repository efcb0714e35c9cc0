use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};
use vault_fs::FileSystem;

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};
use crate::progress::{Monotonic, ProgressSink};
use crate::sizes::KnownSizes;
use crate::source::{AssetSource, HttpSource};

// ---------------------------------------------------------------------------
// AssetState
// ---------------------------------------------------------------------------

/// Where the gate is in acquiring its asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetState {
    /// Nothing checked yet, or the last fetch failed in transit.
    Unchecked,
    /// A fetch from the origin is in progress.
    Fetching,
    /// The asset is stored and has a known-good size.
    Valid,
    /// The origin delivered an asset of the wrong size. Terminal.
    Invalid,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchecked => write!(f, "unchecked"),
            Self::Fetching => write!(f, "fetching"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetGate
// ---------------------------------------------------------------------------

/// Guarantees that one reference asset is stored and intact before the
/// application proceeds.
///
/// The gate reads the asset through the file system mirror; if it is absent
/// or has a length outside [`KnownSizes`] it is fetched from the source,
/// checked again, and committed with [`FileSystem::update`]. A fetched asset
/// of the wrong size is never written.
///
/// Fetches are not retried. A transfer failure returns the gate to
/// [`AssetState::Unchecked`] so the caller may call [`Self::ensure`] again.
pub struct AssetGate {
    name: String,
    sizes: KnownSizes,
    source: Arc<dyn AssetSource>,
    state: AssetState,
    history: Vec<AssetState>,
    rejected_size: Option<u64>,
}

impl AssetGate {
    pub fn new(name: impl Into<String>, sizes: KnownSizes, source: Arc<dyn AssetSource>) -> Self {
        Self {
            name: name.into(),
            sizes,
            source,
            state: AssetState::Unchecked,
            history: vec![AssetState::Unchecked],
            rejected_size: None,
        }
    }

    /// Gate over the configured asset, fetched over HTTP.
    pub fn from_config(config: &GateConfig) -> GateResult<Self> {
        let source = HttpSource::from_config(config)?;
        Ok(Self::new(
            config.asset_name.clone(),
            config.sizes()?,
            Arc::new(source),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    /// Every state the gate has been in, oldest first.
    pub fn history(&self) -> &[AssetState] {
        &self.history
    }

    /// Make sure the asset is stored with a known-good size and return it.
    ///
    /// Returns [`GateError::AssetSizeMismatch`] if the origin delivers an
    /// asset of the wrong size; the gate then stays [`AssetState::Invalid`]
    /// and fails the same way on every later call.
    pub async fn ensure(
        &mut self,
        fs: &dyn FileSystem,
        progress: &dyn ProgressSink,
    ) -> GateResult<Bytes> {
        if self.state == AssetState::Invalid {
            return Err(self.mismatch(self.rejected_size.unwrap_or_default()));
        }

        if let Some(data) = fs.get(&self.name) {
            let len = data.len() as u64;
            if self.sizes.contains(len) {
                if self.state != AssetState::Valid {
                    self.transition(AssetState::Valid);
                }
                return Ok(data);
            }
            warn!(asset = %self.name, len, known = %self.sizes, "stored asset has unknown size, discarding");
            fs.delete(&self.name).await?;
        }

        self.transition(AssetState::Fetching);
        info!(asset = %self.name, origin = %self.source.describe(), "fetching asset");
        let guard = Monotonic::new(progress);
        let data = match self.source.fetch(&guard).await {
            Ok(data) => data,
            Err(e) => {
                warn!(asset = %self.name, error = %e, "asset fetch failed");
                self.transition(AssetState::Unchecked);
                return Err(e);
            }
        };

        let len = data.len() as u64;
        if !self.sizes.contains(len) {
            self.rejected_size = Some(len);
            self.transition(AssetState::Invalid);
            return Err(self.mismatch(len));
        }

        if let Err(e) = fs.update(&self.name, data.clone()).await {
            self.transition(AssetState::Unchecked);
            return Err(e.into());
        }
        self.transition(AssetState::Valid);
        Ok(data)
    }

    fn transition(&mut self, next: AssetState) {
        info!(asset = %self.name, from = %self.state, to = %next, "asset state changed");
        self.state = next;
        self.history.push(next);
    }

    fn mismatch(&self, size: u64) -> GateError {
        GateError::AssetSizeMismatch {
            name: self.name.clone(),
            size,
        }
    }
}

impl fmt::Debug for AssetGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetGate")
            .field("name", &self.name)
            .field("sizes", &self.sizes)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use vault_fs::{DirectoryExport, FsConfig};
    use vault_store::{InMemoryEngine, KvEngine, StoreError};

    use crate::progress::{NoProgress, Progress};

    const SIZES: KnownSizes = KnownSizes::new([10, 20, 30]);

    /// Source that hands out a fixed payload in three progress steps.
    struct StaticSource {
        payload: Option<Bytes>,
        fetches: AtomicUsize,
    }

    impl StaticSource {
        fn serving(len: usize) -> Arc<Self> {
            Arc::new(Self {
                payload: Some(Bytes::from(vec![0xab; len])),
                fetches: AtomicUsize::new(0),
            })
        }

        fn offline() -> Arc<Self> {
            Arc::new(Self {
                payload: None,
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssetSource for StaticSource {
        fn describe(&self) -> String {
            "static".into()
        }

        async fn fetch(&self, progress: &dyn ProgressSink) -> GateResult<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let Some(payload) = &self.payload else {
                return Err(GateError::Fetch("connection refused".into()));
            };
            let len = payload.len() as u64;
            for loaded in [len / 3, len / 3, len] {
                progress.report(Progress::downloading(loaded, 20));
            }
            Ok(payload.clone())
        }
    }

    async fn open_fs() -> (tempfile::TempDir, Arc<dyn FileSystem>) {
        let tmp = tempfile::tempdir().unwrap();
        let engine: Arc<dyn KvEngine> = Arc::new(InMemoryEngine::new());
        let fs = vault_fs::from_engine(
            Ok(engine),
            4,
            FsConfig::default(),
            Arc::new(DirectoryExport::new(tmp.path())),
        )
        .await;
        (tmp, fs)
    }

    fn gate(source: Arc<StaticSource>) -> AssetGate {
        AssetGate::new("DIABDAT.MPQ", SIZES, source)
    }

    // -----------------------------------------------------------------------
    // Acceptance
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stored_valid_asset_needs_no_fetch() {
        let (_tmp, fs) = open_fs().await;
        fs.update("diabdat.mpq", Bytes::from(vec![1; 20])).await.unwrap();
        let source = StaticSource::offline();
        let mut gate = gate(source.clone());

        let data = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap();
        assert_eq!(data.len(), 20);
        assert_eq!(source.fetches(), 0);
        assert_eq!(gate.history(), &[AssetState::Unchecked, AssetState::Valid]);
    }

    #[tokio::test]
    async fn absent_asset_is_fetched_and_committed() {
        let (_tmp, fs) = open_fs().await;
        let source = StaticSource::serving(30);
        let mut gate = gate(source.clone());

        let data = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap();
        assert_eq!(data.len(), 30);
        assert_eq!(source.fetches(), 1);
        assert_eq!(fs.read("diabdat.mpq").await.unwrap().unwrap(), data);
        assert_eq!(fs.get("diabdat.mpq").unwrap(), data);
        assert_eq!(
            gate.history(),
            &[AssetState::Unchecked, AssetState::Fetching, AssetState::Valid]
        );

        // Second call is served from the mirror.
        gate.ensure(fs.as_ref(), &NoProgress).await.unwrap();
        assert_eq!(source.fetches(), 1);
        assert_eq!(gate.history().len(), 3);
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let (_tmp, fs) = open_fs().await;
        let mut gate = gate(StaticSource::serving(30));
        let reports = std::sync::Mutex::new(Vec::new());
        let sink = |p: Progress| reports.lock().unwrap().push((p.loaded, p.total));

        gate.ensure(fs.as_ref(), &sink).await.unwrap();
        let reports = reports.into_inner().unwrap();
        assert_eq!(reports, vec![(10, 20), (10, 20), (30, 30)]);
    }

    // -----------------------------------------------------------------------
    // Rejection and repair
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn wrong_stored_size_is_replaced() {
        let (_tmp, fs) = open_fs().await;
        fs.update("diabdat.mpq", Bytes::from(vec![1; 11])).await.unwrap();
        let source = StaticSource::serving(10);
        let mut gate = gate(source.clone());

        let data = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(source.fetches(), 1);
        assert_eq!(fs.read("diabdat.mpq").await.unwrap().unwrap().len(), 10);
        assert_eq!(
            gate.history(),
            &[AssetState::Unchecked, AssetState::Fetching, AssetState::Valid]
        );
    }

    #[tokio::test]
    async fn wrong_fetched_size_is_invalid_and_not_stored() {
        let (_tmp, fs) = open_fs().await;
        fs.update("diabdat.mpq", Bytes::from(vec![1; 11])).await.unwrap();
        let source = StaticSource::serving(25);
        let mut gate = gate(source.clone());

        let err = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap_err();
        assert!(err.is_integrity_failure());
        assert!(err.to_string().contains("clearing the cache"));
        assert_eq!(gate.state(), AssetState::Invalid);
        assert_eq!(source.fetches(), 1);
        assert!(fs.get("diabdat.mpq").is_none());
        assert!(fs.read("diabdat.mpq").await.unwrap().is_none());

        // Terminal: no further fetches.
        let again = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap_err();
        assert!(matches!(again, GateError::AssetSizeMismatch { size: 25, .. }));
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced_without_retry() {
        let (_tmp, fs) = open_fs().await;
        let source = StaticSource::offline();
        let mut gate = gate(source.clone());

        let err = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap_err();
        assert!(matches!(err, GateError::Fetch(_)));
        assert_eq!(source.fetches(), 1);
        assert_eq!(gate.state(), AssetState::Unchecked);
        assert!(fs.read("diabdat.mpq").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_failure_is_surfaced() {
        let tmp = tempfile::tempdir().unwrap();
        let engine: Arc<dyn KvEngine> = Arc::new(InMemoryEngine::new().with_put_budget(2));
        let fs = vault_fs::from_engine(
            Ok(engine),
            4,
            FsConfig::default(),
            Arc::new(DirectoryExport::new(tmp.path())),
        )
        .await;
        let mut gate = gate(StaticSource::serving(20));

        let err = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap_err();
        assert!(matches!(
            err,
            GateError::Fs(vault_fs::FsError::Store(StoreError::WriteRejected { .. }))
        ));
        assert_eq!(gate.state(), AssetState::Unchecked);
        assert!(fs.get("diabdat.mpq").is_none());
    }

    // -----------------------------------------------------------------------
    // Degraded storage
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn degraded_storage_still_returns_asset() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = vault_fs::from_engine(
            Err(StoreError::EngineUnavailable("none".into())),
            4,
            FsConfig::default(),
            Arc::new(DirectoryExport::new(tmp.path())),
        )
        .await;
        let mut gate = gate(StaticSource::serving(20));

        let data = gate.ensure(fs.as_ref(), &NoProgress).await.unwrap();
        assert_eq!(data.len(), 20);
        assert_eq!(gate.state(), AssetState::Valid);
    }

    #[test]
    fn from_config_uses_http_source() {
        let gate = AssetGate::from_config(&GateConfig::default()).unwrap();
        assert_eq!(gate.name(), "diabdat.mpq");
        assert_eq!(gate.state(), AssetState::Unchecked);
        assert!(format!("{gate:?}").contains("AssetGate"));
    }

    #[test]
    fn state_display() {
        assert_eq!(AssetState::Fetching.to_string(), "fetching");
        assert_eq!(AssetState::Invalid.to_string(), "invalid");
    }
}
