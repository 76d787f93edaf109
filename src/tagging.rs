//! Tag writing and cover art placement
//!
//! Tag values are computed from the [`TrackDescriptor`] and the tagging
//! settings, then handed to a [`TagWriter`]. Failures here are reported as
//! warnings by the pipeline; the audio file is delivered regardless.

use crate::config::TaggingConfig;
use crate::error::{PostProcessError, Result};
use crate::types::TrackDescriptor;
use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Markers that show a title already credits its featured artists
const FEATURING_MARKERS: &[&str] = &["feat.", "ft."];

/// Values written into the audio file's tag
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackTags {
    /// Title, possibly with featured artists appended
    pub title: String,
    /// Artist tag (primary artist or comma-joined list)
    pub artist: String,
    /// Album name
    pub album: String,
    /// Album artist (primary artist)
    pub album_artist: String,
    /// Release year
    pub year: String,
    /// Disc number
    pub disc_number: u32,
    /// Track number
    pub track_number: u32,
    /// Genres, empty when not collected
    pub genres: Vec<String>,
}

impl TrackTags {
    /// Build the tag set for a track
    pub fn new(track: &TrackDescriptor, config: &TaggingConfig, genres: Vec<String>) -> Self {
        Self {
            title: title_with_featured(
                &track.artists,
                &track.title,
                config.add_featured_artists_to_title,
            ),
            artist: artist_tag(&track.artists, config.only_main_artist_in_artist_tag),
            album: track.album.clone(),
            album_artist: track.primary_artist().to_string(),
            year: track.release_year.clone(),
            disc_number: track.disc_number,
            track_number: track.track_number,
            genres,
        }
    }
}

/// Artist tag value: the primary artist alone, or every artist joined by ", "
pub fn artist_tag(artists: &[String], only_main: bool) -> String {
    if only_main {
        artists.first().cloned().unwrap_or_default()
    } else {
        artists.join(", ")
    }
}

/// Append `(feat. X, Y)` for the non-primary artists
///
/// Titles that already carry a featuring marker are left alone.
pub fn title_with_featured(artists: &[String], title: &str, enabled: bool) -> String {
    if !enabled {
        return title.to_string();
    }
    let lower = title.to_lowercase();
    if FEATURING_MARKERS.iter().any(|m| lower.contains(m)) {
        return title.to_string();
    }

    let Some((main, rest)) = artists.split_first() else {
        return title.to_string();
    };
    let featured: Vec<&str> = rest
        .iter()
        .filter(|a| *a != main)
        .map(String::as_str)
        .collect();
    if featured.is_empty() {
        title.to_string()
    } else {
        format!("{} (feat. {})", title, featured.join(", "))
    }
}

/// Merge per-artist genre lists
///
/// Takes the first genre of each artist, or every genre when `all` is set.
/// Duplicates are dropped, order is kept.
pub fn select_genres(per_artist: Vec<Vec<String>>, all: bool) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for artist_genres in per_artist {
        let picked: Vec<String> = if all {
            artist_genres
        } else {
            artist_genres.into_iter().take(1).collect()
        };
        for genre in picked {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }
    }
    genres
}

/// Writes tags into an audio file
#[async_trait]
pub trait TagWriter: Send + Sync {
    /// Write `tags` into the file at `path`
    async fn write(&self, path: &Path, tags: &TrackTags) -> Result<()>;
}

/// [`TagWriter`] backed by `lofty`
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    fn write_blocking(path: &Path, tags: &TrackTags) -> std::result::Result<(), String> {
        let mut tagged = lofty::read_from_path(path).map_err(|e| e.to_string())?;

        if tagged.primary_tag().is_none() {
            let tag_type = tagged.primary_tag_type();
            tagged.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged
            .primary_tag_mut()
            .ok_or_else(|| "file format does not support tags".to_string())?;

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());
        tag.set_track(tags.track_number);
        tag.set_disk(tags.disc_number);
        if !tags.album_artist.is_empty() {
            tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
        }
        if !tags.year.is_empty() {
            tag.insert_text(ItemKey::RecordingDate, tags.year.clone());
        }
        if !tags.genres.is_empty() {
            tag.set_genre(tags.genres.join(", "));
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl TagWriter for LoftyTagWriter {
    async fn write(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        let owned_path = path.to_path_buf();
        let owned_tags = tags.clone();
        let result =
            tokio::task::spawn_blocking(move || Self::write_blocking(&owned_path, &owned_tags))
                .await
                .map_err(|e| PostProcessError::TaggingFailed {
                    path: path.to_path_buf(),
                    reason: format!("tag writer task failed: {}", e),
                })?;

        result.map_err(|reason| {
            PostProcessError::TaggingFailed {
                path: path.to_path_buf(),
                reason,
            }
            .into()
        })
    }
}

/// Write cover art into `directory` unless a file with that name exists
///
/// Uses exclusive creation so that concurrent writers cannot both win.
/// Returns the path when this call created the file.
pub async fn place_cover_art(
    directory: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<Option<PathBuf>> {
    let path = directory.join(filename);
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            debug!(path = ?path, "cover art already present");
            return Ok(None);
        }
        Err(e) => {
            return Err(PostProcessError::CoverArtFailed {
                path,
                reason: e.to_string(),
            }
            .into());
        }
    };

    if let Err(e) = file.write_all(bytes).await {
        drop(file);
        tokio::fs::remove_file(&path).await.ok();
        return Err(PostProcessError::CoverArtFailed {
            path,
            reason: e.to_string(),
        }
        .into());
    }
    file.flush().await?;
    Ok(Some(path))
}
