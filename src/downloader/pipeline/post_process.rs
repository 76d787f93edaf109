//! Post-processing -- conversion, tags, cover art and lyrics.
//!
//! Only conversion can fail a track. A missing encoder and every metadata
//! problem are downgraded to warnings and [`Event::TaggingFailed`] events.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, PostProcessError, Result};
use crate::progress::Loader;
use crate::tagging::{TrackTags, place_cover_art, select_genres};
use crate::transcode::TranscodeRequest;
use crate::types::{Event, PathSet, TrackDescriptor};

use super::context::PipelineContext;
use super::finalization::cleanup_temp;

/// Sibling path holding the raw stream while the encoder writes the working file.
fn raw_path(working: &Path) -> PathBuf {
    let mut name = OsString::from(working.as_os_str());
    name.push(".raw");
    PathBuf::from(name)
}

/// Transcode the working file in place when the target format needs it.
///
/// `NotSupported` from the transcoder keeps the raw stream and returns Ok.
pub(super) async fn convert_audio(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    paths: &PathSet,
) -> Result<()> {
    let download = &ctx.config.download;
    let Some(request) = TranscodeRequest::for_format(
        download.format,
        download.quality,
        ctx.streams.is_elevated(),
    ) else {
        return Ok(());
    };

    let raw = raw_path(&paths.temp_path);
    tokio::fs::rename(&paths.temp_path, &raw).await?;

    let loader = Loader::start("Converting file...", ctx.show_spinner(), &ctx.display);
    let result = ctx
        .transcoder
        .convert(&raw, &paths.temp_path, &request)
        .await;
    loader.stop().await;

    match result {
        Ok(()) => {
            tokio::fs::remove_file(&raw).await.ok();
            debug!(
                track_id = %track.id,
                codec = request.codec,
                bitrate = request.bitrate,
                "conversion complete"
            );
            Ok(())
        }
        Err(Error::NotSupported(reason)) => {
            warn!(
                track_id = %track.id,
                codec = request.codec,
                reason = %reason,
                "skipping conversion, keeping raw stream"
            );
            if let Err(e) = tokio::fs::rename(&raw, &paths.temp_path).await {
                cleanup_temp(&raw).await;
                return Err(e.into());
            }
            ctx.emit(Event::ConversionSkipped {
                id: track.id.clone(),
                reason,
            });
            Ok(())
        }
        Err(e) => {
            tokio::fs::remove_file(&raw).await.ok();
            Err(e)
        }
    }
}

fn report_warning(ctx: &PipelineContext, track: &TrackDescriptor, error: &Error) {
    warn!(track_id = %track.id, error = %error, "metadata step failed, delivering file anyway");
    ctx.emit(Event::TaggingFailed {
        id: track.id.clone(),
        error: error.to_string(),
    });
}

/// Write tags, place cover art and fetch lyrics; never fails the track.
///
/// Returns the lyrics sidecar, if one was written, so a failed move can
/// remove it again.
pub(super) async fn apply_metadata(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    paths: &PathSet,
) -> Option<PathBuf> {
    let genres = collect_genres(ctx, track).await;

    let tags = TrackTags::new(track, &ctx.config.tagging, genres);
    if let Err(e) = ctx.tag_writer.write(&paths.temp_path, &tags).await {
        report_warning(ctx, track, &e);
    }

    if let Err(e) = fetch_cover_art(ctx, track, paths).await {
        report_warning(ctx, track, &e);
    }

    match fetch_lyrics(ctx, track, paths).await {
        Ok(sidecar) => sidecar,
        Err(e) => {
            report_warning(ctx, track, &e);
            None
        }
    }
}

async fn collect_genres(ctx: &PipelineContext, track: &TrackDescriptor) -> Vec<String> {
    if !ctx.config.tagging.save_genres {
        return Vec::new();
    }

    let mut per_artist = Vec::with_capacity(track.raw_artists.len());
    for artist in &track.raw_artists {
        match ctx.catalog.artist_genres(artist).await {
            Ok(genres) => per_artist.push(genres),
            Err(e) => {
                report_warning(ctx, track, &e);
                return Vec::new();
            }
        }
    }

    let genres = select_genres(per_artist, ctx.config.tagging.all_genres);
    if genres.is_empty() {
        debug!(track_id = %track.id, title = %track.title, "no genres found");
    }
    genres
}

async fn fetch_cover_art(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    paths: &PathSet,
) -> Result<()> {
    let tagging = &ctx.config.tagging;
    let Some(url) = track.cover_art_url.as_deref().filter(|_| tagging.cover_art) else {
        return Ok(());
    };

    let target = paths.directory.join(&tagging.cover_art_filename);
    if tokio::fs::try_exists(&target).await.unwrap_or(false) {
        return Ok(());
    }

    let bytes = ctx
        .catalog
        .fetch_bytes(url)
        .await
        .map_err(|e| PostProcessError::CoverArtFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;
    if let Some(path) = place_cover_art(&paths.directory, &tagging.cover_art_filename, &bytes).await? {
        debug!(track_id = %track.id, path = ?path, "cover art written");
    }
    Ok(())
}

async fn fetch_lyrics(
    ctx: &PipelineContext,
    track: &TrackDescriptor,
    paths: &PathSet,
) -> Result<Option<PathBuf>> {
    if !ctx.config.tagging.download_lyrics {
        return Ok(None);
    }

    let lyrics = ctx
        .catalog
        .lyrics(&track.id)
        .await?
        .ok_or_else(|| PostProcessError::LyricsUnavailable {
            id: track.id.to_string(),
        })?;
    let path = lyrics.write_sidecar(&paths.final_path).await?;
    debug!(track_id = %track.id, path = ?path, "lyrics written");
    Ok(Some(path))
}
