use std::sync::Mutex;

/// A progress report during asset transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub text: String,
    /// Bytes received so far.
    pub loaded: u64,
    /// Expected size of the whole transfer.
    pub total: u64,
}

impl Progress {
    pub fn downloading(loaded: u64, total: u64) -> Self {
        Self {
            text: "Downloading...".into(),
            loaded,
            total,
        }
    }
}

/// Receives progress reports.
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn report(&self, progress: Progress) {
        self(progress)
    }
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: Progress) {}
}

/// Forwards reports so that neither `loaded` nor `total` ever decreases.
///
/// Reports with a smaller `loaded` than already seen are dropped; `total` is
/// raised to at least the largest `total` and `loaded` seen.
pub(crate) struct Monotonic<'a> {
    inner: &'a dyn ProgressSink,
    last: Mutex<(u64, u64)>,
}

impl<'a> Monotonic<'a> {
    pub(crate) fn new(inner: &'a dyn ProgressSink) -> Self {
        Self {
            inner,
            last: Mutex::new((0, 0)),
        }
    }
}

impl ProgressSink for Monotonic<'_> {
    fn report(&self, mut progress: Progress) {
        {
            let mut last = self.last.lock().expect("lock poisoned");
            if progress.loaded < last.0 {
                return;
            }
            progress.total = progress.total.max(last.1).max(progress.loaded);
            *last = (progress.loaded, progress.total);
        }
        self.inner.report(progress);
    }
}
