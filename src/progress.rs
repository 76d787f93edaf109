//! Batch progress accounting and terminal indicators
//!
//! [`ProgressAggregator`] keeps the three outcome counters for a batch and
//! drives an `indicatif` bar. [`Loader`] is the small "fetching..." spinner
//! shown while a track's metadata and stream are being set up; it is purely
//! cosmetic and never influences outcomes. Both draw through one shared
//! [`MultiProgress`] so concurrent tracks do not interleave their lines.

use crate::types::{BatchSummary, OutcomeKind};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spinner redraw interval
const LOADER_TICK: Duration = Duration::from_millis(100);

/// Thread-safe outcome counters for one batch
///
/// The total is fixed by the first [`init`](Self::init) call; later calls are
/// ignored even if they announce a different size.
pub struct ProgressAggregator {
    total: OnceLock<usize>,
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    bar: OnceLock<ProgressBar>,
    show_bar: bool,
    display: MultiProgress,
}

impl ProgressAggregator {
    /// Create an uninitialized aggregator drawing into `display`
    pub fn new(show_bar: bool, display: MultiProgress) -> Self {
        Self {
            total: OnceLock::new(),
            downloaded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            bar: OnceLock::new(),
            show_bar,
            display,
        }
    }

    /// Fix the batch size, returns false if already initialized
    pub fn init(&self, total_tracks: usize) -> bool {
        if self.total.set(total_tracks).is_err() {
            return false;
        }
        let bar = if self.show_bar {
            let bar = ProgressBar::new(total_tracks as u64);
            bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} tracks ({elapsed_precise})",
                )
                .map(|style| style.progress_chars("=> "))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            self.display.add(bar)
        } else {
            ProgressBar::with_draw_target(Some(total_tracks as u64), ProgressDrawTarget::hidden())
        };
        // Only the caller that won `total` reaches this point
        self.bar.set(bar).ok();
        true
    }

    /// Whether [`init`](Self::init) has run
    pub fn is_initialized(&self) -> bool {
        self.total.get().is_some()
    }

    /// Count one terminal outcome
    pub fn update(&self, kind: OutcomeKind) {
        let counter = match kind {
            OutcomeKind::Downloaded => &self.downloaded,
            OutcomeKind::Skipped => &self.skipped,
            OutcomeKind::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(bar) = self.bar.get() {
            bar.inc(1);
        }
    }

    /// Current counters without tearing down the bar
    pub fn snapshot(&self) -> BatchSummary {
        let downloaded = self.downloaded.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        BatchSummary {
            total: self
                .total
                .get()
                .copied()
                .unwrap_or(downloaded + skipped + failed),
            downloaded,
            skipped,
            failed,
        }
    }

    /// Final counters; stops the progress bar
    pub fn summary(&self) -> BatchSummary {
        if let Some(bar) = self.bar.get() {
            bar.finish();
        }
        self.snapshot()
    }
}

/// Cooperative "working..." spinner
///
/// Runs on its own task and checks a cancellation token on every tick.
/// Dropping the loader without calling [`stop`](Self::stop) also cancels it.
pub struct Loader {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Loader {
    /// Start a spinner with `desc` below the bars of `display`, or an inert
    /// loader when disabled
    pub fn start(desc: impl Into<String>, enabled: bool, display: &MultiProgress) -> Self {
        let token = CancellationToken::new();
        if !enabled {
            return Self {
                token,
                handle: None,
            };
        }

        let desc = desc.into();
        let cancel = token.clone();
        let display = display.clone();
        let handle = tokio::spawn(async move {
            let spinner = display.add(ProgressBar::new_spinner());
            spinner.set_style(
                ProgressStyle::with_template("\t{spinner} {msg}")
                    .map(|style| style.tick_chars("-\\|/ "))
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(desc);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(LOADER_TICK) => spinner.tick(),
                }
            }
            spinner.finish_and_clear();
            display.remove(&spinner);
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and wait for it to clear its line
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.ok();
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
