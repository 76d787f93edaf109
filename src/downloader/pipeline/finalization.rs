//! Finalization -- move into place, record in the dedup stores, report outcomes.

use std::path::Path;

use tracing::{debug, error, info};

use crate::dedup::DedupRecord;
use crate::error::{PostProcessError, Result};
use crate::naming::Resolution;
use crate::progress::ProgressAggregator;
use crate::types::{BatchContext, Event, Outcome, PathSet, TrackDescriptor, TrackId};

use super::context::PipelineContext;

/// Move the working file to its final path when they differ.
///
/// Falls back to copy + delete when a rename is not possible (scratch
/// directory on another filesystem).
pub(super) async fn move_into_place(paths: &PathSet) -> Result<()> {
    if !paths.needs_move() {
        return Ok(());
    }

    debug!(source = ?paths.temp_path, destination = ?paths.final_path, "moving file into place");
    if tokio::fs::rename(&paths.temp_path, &paths.final_path)
        .await
        .is_ok()
    {
        return Ok(());
    }

    let move_failed = |reason: String| PostProcessError::MoveFailed {
        source_path: paths.temp_path.clone(),
        dest_path: paths.final_path.clone(),
        reason,
    };
    tokio::fs::copy(&paths.temp_path, &paths.final_path)
        .await
        .map_err(|e| move_failed(e.to_string()))?;
    tokio::fs::remove_file(&paths.temp_path)
        .await
        .map_err(|e| move_failed(e.to_string()))?;
    Ok(())
}

/// Append the delivered track to the global archive (when enabled) and to
/// its directory's index (when not already present there).
pub(super) async fn record_download(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    resolution: &Resolution,
) -> Result<()> {
    let record = DedupRecord {
        id: track.id.clone(),
        filename: resolution.paths.file_name(),
        artist: track.primary_artist().to_string(),
        title: track.title.clone(),
    };

    if ctx.config.download.skip_previously_downloaded {
        ctx.dedup.record_global(&record).await?;
    }
    if !resolution.exists_by_id {
        ctx.dedup
            .record(&resolution.paths.directory, &record)
            .await?;
    }
    Ok(())
}

/// Remove the working file after a failure, if one was created.
pub(super) async fn cleanup_temp(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = ?path, "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!(path = ?path, error = %e, "failed to remove partial file"),
    }
}

/// Log the outcome line, publish its event and count it.
pub(super) fn report_outcome(
    ctx: &PipelineContext,
    progress: &ProgressAggregator,
    requested: &TrackId,
    batch: &BatchContext,
    outcome: &Outcome,
) {
    match outcome {
        Outcome::Downloaded { id, path } => {
            let shown = path
                .strip_prefix(ctx.config.root_path())
                .unwrap_or(path.as_path());
            info!(track_id = %id, path = ?shown, "downloaded");
            ctx.emit(Event::TrackDownloaded {
                id: id.clone(),
                path: path.clone(),
            });
        }
        Outcome::Failed { stage, reason } => {
            error!(
                track_id = %requested,
                stage = ?stage,
                error = %reason,
                context = ?batch.fields(),
                "skipping track after failure"
            );
            ctx.emit(Event::TrackFailed {
                id: requested.clone(),
                stage: *stage,
                error: reason.clone(),
            });
        }
        skipped => {
            let reason = skipped.skip_reason().unwrap_or("skipped");
            info!(track_id = %requested, reason, "skipping track");
            ctx.emit(Event::TrackSkipped {
                id: requested.clone(),
                reason: reason.to_string(),
            });
        }
    }

    progress.update(outcome.kind());
}
