//! Remote catalog access -- metadata lookups, collection pages and link parsing.
//!
//! Split into focused submodules:
//! - [`wire`] - JSON payloads returned by the catalog web API
//! - [`http`] - Production [`CatalogApi`] over HTTPS
//!
//! Authentication is handled by the embedding application, which hands a
//! bearer token to [`HttpCatalog`].

mod http;
pub mod wire;

pub use http::HttpCatalog;

use crate::error::{Error, Result};
use crate::lyrics::Lyrics;
use crate::types::{ArtistRef, TrackDescriptor, TrackId};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// Page size used for every paginated collection request
pub const PAGE_LIMIT: usize = 50;

/// One page of a paginated collection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries of this page, in collection order
    pub items: Vec<T>,
    /// Total number of entries the collection declares
    pub total: usize,
}

/// Track entry inside a collection page
///
/// Playlists may contain local or removed tracks without an identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRef {
    /// Track identifier, if the entry refers to a catalog track
    pub id: Option<TrackId>,
}

impl TrackRef {
    /// Entry for a catalog track
    pub fn new(id: impl Into<TrackId>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

/// Album entry of an artist discography
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumRef {
    /// Album identifier
    pub id: String,
    /// Album name
    pub name: String,
}

/// Album header plus its first page of tracks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumInfo {
    /// Album identifier
    pub id: String,
    /// Album name
    pub name: String,
    /// Primary album artist
    pub artist: String,
    /// Release year
    pub release_year: String,
    /// Embedded first page of tracks
    pub tracks: Page<TrackRef>,
}

/// Playlist header plus its first page of tracks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistInfo {
    /// Playlist identifier
    pub id: String,
    /// Playlist name
    pub name: String,
    /// Embedded first page of tracks
    pub tracks: Page<TrackRef>,
}

/// Abstraction over the remote metadata service, enabling testability.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Full descriptor for one track
    async fn track(&self, id: &TrackId) -> Result<TrackDescriptor>;

    /// Album header with its embedded first page
    async fn album(&self, id: &str) -> Result<AlbumInfo>;

    /// A later page of album tracks
    async fn album_tracks(&self, id: &str, offset: usize, limit: usize) -> Result<Page<TrackRef>>;

    /// Playlist header with its embedded first page
    async fn playlist(&self, id: &str) -> Result<PlaylistInfo>;

    /// A later page of playlist tracks
    async fn playlist_tracks(
        &self,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TrackRef>>;

    /// A page of an artist's albums
    async fn artist_albums(&self, id: &str, offset: usize, limit: usize) -> Result<Page<AlbumRef>>;

    /// A page of the account's saved tracks
    async fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Page<TrackRef>>;

    /// Identifiers of artists the account follows
    async fn followed_artists(&self) -> Result<Vec<String>>;

    /// Genres of an artist
    async fn artist_genres(&self, artist: &ArtistRef) -> Result<Vec<String>>;

    /// Lyrics for a track, `None` when the service has none
    async fn lyrics(&self, id: &TrackId) -> Result<Option<Lyrics>>;

    /// Raw bytes behind a URL (cover art)
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// Kind of catalog entity a link points at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A single track
    Track,
    /// An album
    Album,
    /// A playlist
    Playlist,
    /// An artist discography
    Artist,
}

impl EntityKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(EntityKind::Track),
            "album" => Some(EntityKind::Album),
            "playlist" => Some(EntityKind::Playlist),
            "artist" => Some(EntityKind::Artist),
            _ => None,
        }
    }
}

/// A parsed link to a track, album, playlist or artist
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntity {
    /// What the link points at
    pub kind: EntityKind,
    /// Identifier of the entity
    pub id: String,
}

static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z]+:(track|album|playlist|artist):([A-Za-z0-9]+)$").expect("valid regex")
});

static ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9]+$").expect("valid regex")
});

impl CatalogEntity {
    /// Parse a share URL (`https://open.<service>.com/album/<id>?si=...`,
    /// optionally with an `intl-xx` locale segment) or a `<service>:<kind>:<id>` URI.
    pub fn parse(link: &str) -> Result<Self> {
        let link = link.trim();

        if let Some(caps) = URI_RE.captures(link) {
            let kind = EntityKind::from_segment(&caps[1])
                .ok_or_else(|| Error::InvalidLink(link.to_string()))?;
            return Ok(Self {
                kind,
                id: caps[2].to_string(),
            });
        }

        let url = url::Url::parse(link).map_err(|_| Error::InvalidLink(link.to_string()))?;
        if !url.host_str().is_some_and(|h| h.starts_with("open.")) {
            return Err(Error::InvalidLink(link.to_string()));
        }

        let mut segments = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty() && !s.starts_with("intl-"));

        let kind = segments
            .next()
            .and_then(EntityKind::from_segment)
            .ok_or_else(|| Error::InvalidLink(link.to_string()))?;
        let id = segments
            .next()
            .filter(|id| ID_RE.is_match(id))
            .ok_or_else(|| Error::InvalidLink(link.to_string()))?;

        Ok(Self {
            kind,
            id: id.to_string(),
        })
    }
}
