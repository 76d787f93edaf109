//! Content streaming -- transfer a track's bytes into its working file.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

use crate::error::{Error, Result, StreamError};
use crate::pacing::RealTimePacer;
use crate::types::{Event, PathSet, TrackDescriptor};

use super::context::PipelineContext;

/// Consecutive empty reads that mark the end of a stream
const END_OF_STREAM_EMPTY_READS: u32 = 2;

/// What a finished transfer produced.
pub(super) struct StreamStats {
    pub(super) bytes_written: u64,
    pub(super) declared_size: u64,
    pub(super) elapsed: Duration,
}

/// Open the content stream for the canonical id and write it to `paths.temp_path`.
///
/// Creates the output directory (and the scratch directory when used) first.
/// With real-time pacing enabled, each chunk is followed by a sleep that keeps
/// the transfer at roughly playback speed.
pub(super) async fn stream_track(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    paths: &PathSet,
) -> Result<StreamStats> {
    let elevated = ctx.streams.is_elevated();
    let quality = ctx.config.download.quality.resolve(elevated);
    let mut stream = ctx.streams.open(&track.id, quality).await?;

    tokio::fs::create_dir_all(&paths.directory).await?;
    if let Some(parent) = paths.temp_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let declared_size = stream.size();
    ctx.emit(Event::Streaming {
        id: track.id.clone(),
        total_bytes: declared_size,
    });
    tracing::debug!(
        track_id = %track.id,
        quality = %quality,
        size = declared_size,
        temp_path = ?paths.temp_path,
        "streaming track"
    );

    let pacer = ctx
        .config
        .download
        .real_time
        .then(|| RealTimePacer::start(declared_size, track.duration_ms));
    let chunk_size = ctx.config.download.chunk_size.max(1);

    let started = Instant::now();
    let mut file = tokio::fs::File::create(&paths.temp_path).await?;
    let mut written = 0u64;
    let mut empty_reads = 0u32;

    while empty_reads < END_OF_STREAM_EMPTY_READS {
        let chunk = stream
            .read_chunk(chunk_size)
            .await
            .map_err(|e| match e {
                e @ Error::Stream(_) => e,
                other => StreamError::ReadFailed {
                    bytes_read: written,
                    reason: other.to_string(),
                }
                .into(),
            })?;

        if chunk.is_empty() {
            empty_reads += 1;
            continue;
        }
        empty_reads = 0;

        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if let Some(ref pacer) = pacer {
            pacer.pace(written).await;
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(StreamStats {
        bytes_written: written,
        declared_size,
        elapsed: started.elapsed(),
    })
}
