//! Pipeline orchestration -- the state machine for one track.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::naming::Resolution;
use crate::progress::{Loader, ProgressAggregator};
use crate::types::{
    BatchContext, DownloadMode, Event, Outcome, OutcomeKind, Stage, TrackDescriptor, TrackId,
};

use super::context::PipelineContext;
use super::finalization::{cleanup_temp, move_into_place, record_download, report_outcome};
use super::post_process::{apply_metadata, convert_audio};
use super::streaming::stream_track;

/// Result of the checks that run before any byte is written.
enum Prepared {
    /// Terminal outcome reached without streaming
    Done(Outcome),
    /// Track cleared for download, final path claimed
    Ready(Box<TrackDescriptor>, Resolution),
}

fn failed(stage: Stage, error: &Error) -> Outcome {
    Outcome::Failed {
        stage,
        reason: error.to_string(),
    }
}

/// Run one track through the pipeline and return its terminal outcome.
///
/// States: metadata lookup, playability check, dedup check, stream, convert,
/// tag, archive. Exactly one progress counter is incremented per call, and a
/// failure never escapes as an error; siblings in a batch are unaffected.
pub(crate) async fn run_track(
    ctx: &PipelineContext,
    progress: &ProgressAggregator,
    mode: DownloadMode,
    requested: &TrackId,
    batch: &BatchContext,
) -> Outcome {
    ctx.emit(Event::TrackStarted {
        id: requested.clone(),
    });
    if !progress.is_initialized() {
        progress.init(batch.total_tracks.max(1));
    }

    let loader = Loader::start("Preparing download...", ctx.show_spinner(), &ctx.display);
    let prepared = prepare(ctx, mode, requested, batch).await;
    loader.stop().await;

    let outcome = match prepared {
        Prepared::Done(outcome) => outcome,
        Prepared::Ready(track, resolution) => {
            let outcome = deliver(ctx, &track, &resolution).await;
            let paths = &resolution.paths;
            if let Err(e) = ctx
                .dedup
                .release_claim(&paths.directory, &paths.final_path)
                .await
            {
                warn!(track_id = %track.id, error = %e, "failed to release path claim");
            }
            outcome
        }
    };

    report_outcome(ctx, progress, requested, batch, &outcome);

    let wait = ctx.config.download.bulk_wait_time;
    if outcome.kind() == OutcomeKind::Downloaded && !wait.is_zero() {
        debug!(seconds = wait.as_secs(), "waiting before next track");
        tokio::time::sleep(wait).await;
    }

    outcome
}

/// Metadata lookup, playability and dedup checks.
async fn prepare(
    ctx: &PipelineContext,
    mode: DownloadMode,
    requested: &TrackId,
    batch: &BatchContext,
) -> Prepared {
    let track = match ctx.catalog.track(requested).await {
        Ok(track) => track,
        Err(e) => return Prepared::Done(failed(Stage::Metadata, &e)),
    };

    if !track.is_playable {
        return Prepared::Done(Outcome::SkippedUnplayable);
    }

    if track.id != *requested {
        debug!(requested = %requested, canonical = %track.id, "using canonical track id");
    }

    let resolution = match ctx.naming.resolve(&track, batch, mode, &ctx.dedup).await {
        Ok(resolution) => resolution,
        Err(e) => return Prepared::Done(failed(Stage::Naming, &e)),
    };

    let download = &ctx.config.download;
    let skip = if resolution.exists_by_id && resolution.exists_by_name && download.skip_existing {
        Some(Outcome::SkippedExists)
    } else if download.skip_previously_downloaded {
        match ctx.dedup.exists_globally(&track.id).await {
            Ok(true) => Some(Outcome::SkippedPreviouslyDownloaded),
            Ok(false) => None,
            Err(e) => Some(failed(Stage::Naming, &e)),
        }
    } else {
        None
    };

    match skip {
        Some(outcome) => {
            let paths = &resolution.paths;
            ctx.dedup
                .release_claim(&paths.directory, &paths.final_path)
                .await
                .ok();
            Prepared::Done(outcome)
        }
        None => Prepared::Ready(Box::new(track), resolution),
    }
}

/// Stream, convert, tag and archive a cleared track.
async fn deliver(ctx: &PipelineContext, track: &TrackDescriptor, resolution: &Resolution) -> Outcome {
    let paths = &resolution.paths;

    let stats = match stream_track(ctx, track, paths).await {
        Ok(stats) => stats,
        Err(e) => {
            cleanup_temp(&paths.temp_path).await;
            return failed(Stage::Stream, &e);
        }
    };
    let post_started = Instant::now();

    if let Err(e) = convert_audio(ctx, track, paths).await {
        cleanup_temp(&paths.temp_path).await;
        return failed(Stage::Convert, &e);
    }

    let sidecar = apply_metadata(ctx, track, paths).await;

    if let Err(e) = move_into_place(paths).await {
        cleanup_temp(&paths.temp_path).await;
        if let Some(sidecar) = sidecar {
            cleanup_temp(&sidecar).await;
        }
        return failed(Stage::Archive, &e);
    }

    // The file is delivered at this point; a bookkeeping failure is reported
    // but the file stays.
    if let Err(e) = record_download(ctx, track, resolution).await {
        return failed(Stage::Archive, &e);
    }

    info!(
        track_id = %track.id,
        title = %track.title,
        artist = %track.primary_artist(),
        track_number = track.track_number,
        size_mb = %format!("{:.2}", stats.declared_size as f64 / 1024.0 / 1024.0),
        bytes_written = stats.bytes_written,
        download_secs = stats.elapsed.as_secs_f64(),
        post_process_secs = post_started.elapsed().as_secs_f64(),
        "track transferred"
    );

    Outcome::Downloaded {
        id: track.id.clone(),
        path: paths.final_path.clone(),
    }
}
