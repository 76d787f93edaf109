//! Core downloader implementation split into focused submodules.
//!
//! The `TrackDownloader` struct and its methods are organized by domain:
//! - [`pipeline`] - Per-track state machine (metadata, dedup, stream, convert, tag, archive)
//! - [`batch`] - Collection downloads (album, playlist, artist, saved tracks, followed artists)

mod batch;
pub(crate) mod pipeline;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use indicatif::MultiProgress;
use tokio::sync::{RwLock, broadcast};

use crate::catalog::CatalogApi;
use crate::config::Config;
use crate::dedup::DedupIndex;
use crate::expander::EntityExpander;
use crate::naming::NamingResolver;
use crate::progress::ProgressAggregator;
use crate::stream::ContentStreamProvider;
use crate::tagging::{LoftyTagWriter, TagWriter};
use crate::transcode::{self, Transcoder};
use crate::types::{BatchContext, BatchSummary, DownloadMode, Event, Outcome, TrackId};

use pipeline::PipelineContext;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Holds the explicit run context every pipeline call is threaded through:
/// configuration, remote collaborators, the dedup stores, the batch progress
/// counters and the event channel. Clones share all of it, so a clone can be
/// moved into a spawned task.
#[derive(Clone)]
pub struct TrackDownloader {
    /// Configuration (shared across tasks)
    pub(crate) config: Arc<Config>,
    /// Collaborators and shared state handed to every track
    pub(crate) pipeline: PipelineContext,
    /// Collection expansion over the same catalog
    pub(crate) expander: EntityExpander,
    /// Counters of the batch in progress, swapped out by [`finish`](Self::finish)
    pub(crate) progress: Arc<RwLock<Arc<ProgressAggregator>>>,
}

impl TrackDownloader {
    /// Create a new TrackDownloader instance
    ///
    /// Uses ffmpeg for conversion (explicit path, PATH lookup, or none per
    /// [`ToolsConfig`](crate::config::ToolsConfig)) and lofty for tag writing.
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogApi>,
        streams: Arc<dyn ContentStreamProvider>,
    ) -> Self {
        let transcoder = transcode::from_config(&config.tools);
        Self::with_transcoder(config, catalog, streams, transcoder, Arc::new(LoftyTagWriter))
    }

    /// Create a TrackDownloader with explicit transcoder and tag writer implementations
    pub fn with_transcoder(
        config: Config,
        catalog: Arc<dyn CatalogApi>,
        streams: Arc<dyn ContentStreamProvider>,
        transcoder: Arc<dyn Transcoder>,
        tag_writer: Arc<dyn TagWriter>,
    ) -> Self {
        // A zero capacity would panic in broadcast::channel
        let (event_tx, _rx) = broadcast::channel(config.output.event_capacity.max(1));
        let dedup = Arc::new(DedupIndex::new(config.download.archive_file()));
        let naming = NamingResolver::new(&config);
        let display = MultiProgress::new();
        let progress = ProgressAggregator::new(config.output.show_progress, display.clone());
        let config = Arc::new(config);

        tracing::debug!(
            root = ?config.root_path(),
            format = ?config.download.format,
            transcoder = transcoder.name(),
            "downloader initialized"
        );

        let pipeline = PipelineContext {
            config: config.clone(),
            catalog: catalog.clone(),
            streams,
            transcoder,
            tag_writer,
            dedup,
            naming,
            event_tx,
            display,
        };

        Self {
            config,
            pipeline,
            expander: EntityExpander::new(catalog),
            progress: Arc::new(RwLock::new(Arc::new(progress))),
        }
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than `output.event_capacity` events
    /// receives a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.pipeline.event_tx.subscribe()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dedup stores used by this downloader
    pub fn dedup(&self) -> &DedupIndex {
        &self.pipeline.dedup
    }

    /// Run one track through the pipeline
    ///
    /// Never returns an error: skips and failures are [`Outcome`] variants,
    /// and each call increments exactly one counter of the current batch.
    /// The batch total is fixed by the first track (or batch helper) that
    /// touches the counters, using `batch.total_tracks`.
    pub async fn download_track(
        &self,
        mode: DownloadMode,
        id: &TrackId,
        batch: &BatchContext,
    ) -> Outcome {
        let progress = self.current_progress().await;
        pipeline::run_track(&self.pipeline, &progress, mode, id, batch).await
    }

    /// Counters of the batch in progress
    pub async fn progress(&self) -> BatchSummary {
        self.current_progress().await.snapshot()
    }

    /// Close the current batch
    ///
    /// Stops the progress bar, publishes [`Event::BatchComplete`] and returns
    /// the final counters. The next track starts a fresh batch.
    pub async fn finish(&self) -> BatchSummary {
        let finished = {
            let mut guard = self.progress.write().await;
            std::mem::replace(
                &mut *guard,
                Arc::new(ProgressAggregator::new(
                    self.config.output.show_progress,
                    self.pipeline.display.clone(),
                )),
            )
        };

        let summary = finished.summary();
        tracing::info!(
            total = summary.total,
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "batch complete"
        );
        self.pipeline.emit(Event::BatchComplete { summary });
        summary
    }

    pub(crate) async fn current_progress(&self) -> Arc<ProgressAggregator> {
        self.progress.read().await.clone()
    }
}
