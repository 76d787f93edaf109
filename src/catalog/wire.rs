//! JSON payloads returned by the catalog web API.
//!
//! Fields the engine requires are still `Option` here so that a malformed
//! response surfaces as a [`MetadataError::MissingField`] naming the field
//! instead of an opaque deserialization error.

#![allow(missing_docs)]

use serde::Deserialize;

use super::{AlbumInfo, AlbumRef, Page, PlaylistInfo, TrackRef};
use crate::error::MetadataError;
use crate::lyrics::{LyricLine, Lyrics, LyricsSync};
use crate::types::{ArtistRef, TrackDescriptor, TrackId};

/// Response of the batched track lookup
#[derive(Debug, Deserialize)]
pub struct TracksResponse {
    /// Requested tracks (null entries for unknown identifiers)
    #[serde(default)]
    pub tracks: Option<Vec<Option<TrackObject>>>,
}

/// Full track object
#[derive(Debug, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    pub album: Option<AlbumObject>,
    pub disc_number: Option<u32>,
    pub track_number: Option<u32>,
    pub duration_ms: Option<u64>,
    pub is_playable: Option<bool>,
}

/// Simplified artist object
#[derive(Debug, Deserialize)]
pub struct ArtistObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub href: Option<String>,
}

/// Album object, simplified or full
#[derive(Debug, Deserialize)]
pub struct AlbumObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageObject>,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
    pub tracks: Option<PagingObject<SimpleTrackObject>>,
}

/// Cover art variant
#[derive(Debug, Deserialize)]
pub struct ImageObject {
    pub url: String,
    pub width: Option<u32>,
}

/// Track entry inside album pages
#[derive(Debug, Deserialize)]
pub struct SimpleTrackObject {
    pub id: Option<String>,
}

/// Track entry inside playlist and saved-track pages
#[derive(Debug, Deserialize)]
pub struct WrappedTrackObject {
    pub track: Option<SimpleTrackObject>,
}

/// Generic paging object
#[derive(Debug, Deserialize)]
pub struct PagingObject<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: usize,
}

/// Playlist object
#[derive(Debug, Deserialize)]
pub struct PlaylistObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub tracks: Option<PagingObject<WrappedTrackObject>>,
}

/// Full artist object (genres only)
#[derive(Debug, Deserialize)]
pub struct ArtistDetails {
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Response of the followed-artists endpoint
#[derive(Debug, Deserialize)]
pub struct FollowedArtistsResponse {
    pub artists: PagingObject<ArtistObject>,
}

/// Response of the lyrics endpoint
#[derive(Debug, Deserialize)]
pub struct LyricsResponse {
    pub lyrics: Option<LyricsObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsObject {
    pub sync_type: Option<String>,
    #[serde(default)]
    pub lines: Vec<LyricLineObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLineObject {
    #[serde(default)]
    pub start_time_ms: Option<String>,
    #[serde(default)]
    pub words: String,
}

fn required<T>(value: Option<T>, id: &str, field: &'static str) -> Result<T, MetadataError> {
    value.ok_or_else(|| MetadataError::MissingField {
        id: id.to_string(),
        field,
    })
}

impl TracksResponse {
    /// Extract and validate the first track of the response
    pub fn into_descriptor(self, requested: &TrackId) -> Result<TrackDescriptor, MetadataError> {
        let track = self
            .tracks
            .and_then(|tracks| tracks.into_iter().next().flatten())
            .ok_or_else(|| MetadataError::EmptyResponse {
                id: requested.to_string(),
            })?;
        track.into_descriptor(requested)
    }
}

impl TrackObject {
    /// Validate required fields and build a descriptor
    pub fn into_descriptor(self, requested: &TrackId) -> Result<TrackDescriptor, MetadataError> {
        let rid = requested.as_str();
        let id = required(self.id, rid, "id")?;
        let title = required(self.name, rid, "name")?;
        let album = required(self.album, rid, "album")?;
        let album_name = required(album.name, rid, "album.name")?;
        let release_date = required(album.release_date, rid, "album.release_date")?;
        let release_year = release_date
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();

        if self.artists.is_empty() {
            return Err(MetadataError::MissingField {
                id: rid.to_string(),
                field: "artists",
            });
        }

        let mut raw_artists = Vec::with_capacity(self.artists.len());
        for artist in self.artists {
            raw_artists.push(ArtistRef {
                id: artist.id.unwrap_or_default(),
                name: required(artist.name, rid, "artists.name")?,
                href: artist.href,
            });
        }

        // Largest variant wins; the first listed is kept on ties
        let cover_art_url = album
            .images
            .iter()
            .fold(None::<&ImageObject>, |best, img| match best {
                Some(b) if img.width.unwrap_or(0) <= b.width.unwrap_or(0) => Some(b),
                _ => Some(img),
            })
            .map(|img| img.url.clone());

        Ok(TrackDescriptor {
            id: TrackId(id),
            artists: raw_artists.iter().map(|a| a.name.clone()).collect(),
            album: album_name,
            title,
            release_year,
            disc_number: required(self.disc_number, rid, "disc_number")?,
            track_number: required(self.track_number, rid, "track_number")?,
            duration_ms: required(self.duration_ms, rid, "duration_ms")?,
            is_playable: required(self.is_playable, rid, "is_playable")?,
            cover_art_url,
            raw_artists,
        })
    }
}

impl From<PagingObject<SimpleTrackObject>> for Page<TrackRef> {
    fn from(page: PagingObject<SimpleTrackObject>) -> Self {
        Page {
            items: page
                .items
                .into_iter()
                .map(|t| TrackRef {
                    id: t.id.map(TrackId),
                })
                .collect(),
            total: page.total,
        }
    }
}

impl From<PagingObject<WrappedTrackObject>> for Page<TrackRef> {
    fn from(page: PagingObject<WrappedTrackObject>) -> Self {
        Page {
            items: page
                .items
                .into_iter()
                .map(|w| TrackRef {
                    id: w.track.and_then(|t| t.id).map(TrackId),
                })
                .collect(),
            total: page.total,
        }
    }
}

impl From<PagingObject<AlbumObject>> for Page<AlbumRef> {
    fn from(page: PagingObject<AlbumObject>) -> Self {
        Page {
            items: page
                .items
                .into_iter()
                .map(|a| AlbumRef {
                    id: a.id.unwrap_or_default(),
                    name: a.name.unwrap_or_default(),
                })
                .collect(),
            total: page.total,
        }
    }
}

impl AlbumObject {
    /// Validate and convert into an [`AlbumInfo`]
    pub fn into_info(self, requested: &str) -> Result<AlbumInfo, MetadataError> {
        let name = required(self.name, requested, "name")?;
        let release_date = required(self.release_date, requested, "release_date")?;
        let tracks = required(self.tracks, requested, "tracks")?;
        Ok(AlbumInfo {
            id: self.id.unwrap_or_else(|| requested.to_string()),
            artist: self
                .artists
                .into_iter()
                .next()
                .and_then(|a| a.name)
                .unwrap_or_else(|| name.clone()),
            name,
            release_year: release_date
                .split('-')
                .next()
                .unwrap_or_default()
                .to_string(),
            tracks: tracks.into(),
        })
    }
}

impl PlaylistObject {
    /// Validate and convert into a [`PlaylistInfo`]
    pub fn into_info(self, requested: &str) -> Result<PlaylistInfo, MetadataError> {
        let name = required(self.name, requested, "name")?;
        let tracks = required(self.tracks, requested, "tracks")?;
        Ok(PlaylistInfo {
            id: self.id.unwrap_or_else(|| requested.to_string()),
            name,
            tracks: tracks.into(),
        })
    }
}

impl LyricsResponse {
    /// Convert into [`Lyrics`], `None` when the payload carries no lines
    pub fn into_lyrics(self) -> Option<Lyrics> {
        let lyrics = self.lyrics?;
        let sync = match lyrics.sync_type.as_deref() {
            Some("UNSYNCED") => LyricsSync::Unsynced,
            Some("LINE_SYNCED") => LyricsSync::LineSynced,
            _ => return None,
        };
        let lines = lyrics
            .lines
            .into_iter()
            .map(|line| LyricLine {
                start_ms: line
                    .start_time_ms
                    .and_then(|ms| ms.parse().ok())
                    .unwrap_or(0),
                words: line.words,
            })
            .collect();
        Some(Lyrics { sync, lines })
    }
}
