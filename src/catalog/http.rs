//! Production [`CatalogApi`] over the catalog's HTTPS web API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::wire::{
    AlbumObject, ArtistDetails, FollowedArtistsResponse, LyricsResponse, PagingObject,
    PlaylistObject, SimpleTrackObject, TracksResponse, WrappedTrackObject,
};
use super::{AlbumInfo, AlbumRef, CatalogApi, Page, PlaylistInfo, TrackRef};
use crate::error::{MetadataError, Result};
use crate::lyrics::Lyrics;
use crate::types::{ArtistRef, TrackDescriptor, TrackId};

const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_LYRICS_BASE: &str = "https://spclient.wg.spotify.com/color-lyrics/v2/track";

/// HTTP catalog client authenticated with a bearer token
///
/// # Examples
///
/// ```no_run
/// use track_dl::catalog::{CatalogApi, HttpCatalog};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let catalog = HttpCatalog::new("access-token");
/// let album = catalog.album("4aawyAB9vmqN3uQ7FjRGTy").await?;
/// println!("{} ({} tracks)", album.name, album.tracks.total);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    api_base: String,
    lyrics_base: String,
    token: String,
}

impl HttpCatalog {
    /// Client for the public API endpoints
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_urls(DEFAULT_API_BASE, DEFAULT_LYRICS_BASE, token)
    }

    /// Client for custom endpoints (proxies, test servers)
    pub fn with_base_urls(
        api_base: impl Into<String>,
        lyrics_base: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            lyrics_base: lyrics_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn get_raw(&self, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        debug!(url, "catalog request");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.get_raw(url, query).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        Ok(response.json::<T>().await?)
    }

    fn page_query(offset: usize, limit: usize) -> Vec<(&'static str, String)> {
        vec![("offset", offset.to_string()), ("limit", limit.to_string())]
    }
}

#[async_trait]
impl CatalogApi for HttpCatalog {
    async fn track(&self, id: &TrackId) -> Result<TrackDescriptor> {
        let url = format!("{}/tracks", self.api_base);
        let resp: TracksResponse = self
            .get_json(
                &url,
                &[("ids", id.to_string()), ("market", "from_token".to_string())],
            )
            .await?;
        Ok(resp.into_descriptor(id)?)
    }

    async fn album(&self, id: &str) -> Result<AlbumInfo> {
        let url = format!("{}/albums/{}", self.api_base, id);
        let album: AlbumObject = self.get_json(&url, &[]).await?;
        Ok(album.into_info(id)?)
    }

    async fn album_tracks(&self, id: &str, offset: usize, limit: usize) -> Result<Page<TrackRef>> {
        let url = format!("{}/albums/{}/tracks", self.api_base, id);
        let page: PagingObject<SimpleTrackObject> =
            self.get_json(&url, &Self::page_query(offset, limit)).await?;
        Ok(page.into())
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistInfo> {
        let url = format!("{}/playlists/{}", self.api_base, id);
        let playlist: PlaylistObject = self.get_json(&url, &[]).await?;
        Ok(playlist.into_info(id)?)
    }

    async fn playlist_tracks(
        &self,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TrackRef>> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, id);
        let page: PagingObject<WrappedTrackObject> =
            self.get_json(&url, &Self::page_query(offset, limit)).await?;
        Ok(page.into())
    }

    async fn artist_albums(&self, id: &str, offset: usize, limit: usize) -> Result<Page<AlbumRef>> {
        let url = format!("{}/artists/{}/albums", self.api_base, id);
        let page: PagingObject<AlbumObject> =
            self.get_json(&url, &Self::page_query(offset, limit)).await?;
        Ok(page.into())
    }

    async fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Page<TrackRef>> {
        let url = format!("{}/me/tracks", self.api_base);
        let page: PagingObject<WrappedTrackObject> =
            self.get_json(&url, &Self::page_query(offset, limit)).await?;
        Ok(page.into())
    }

    async fn followed_artists(&self) -> Result<Vec<String>> {
        let url = format!("{}/me/following", self.api_base);
        let resp: FollowedArtistsResponse =
            self.get_json(&url, &[("type", "artist".to_string())]).await?;
        Ok(resp
            .artists
            .items
            .into_iter()
            .filter_map(|a| a.id)
            .collect())
    }

    async fn artist_genres(&self, artist: &ArtistRef) -> Result<Vec<String>> {
        let url = match &artist.href {
            Some(href) => href.clone(),
            None => format!("{}/artists/{}", self.api_base, artist.id),
        };
        let details: ArtistDetails = self.get_json(&url, &[]).await?;
        Ok(details.genres)
    }

    async fn lyrics(&self, id: &TrackId) -> Result<Option<Lyrics>> {
        let url = format!("{}/{}", self.lyrics_base, id);
        let response = self.get_raw(&url, &[]).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::NO_CONTENT
        {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(MetadataError::BadStatus {
                url,
                status: response.status().as_u16(),
            }
            .into());
        }
        let resp: LyricsResponse = response.json().await?;
        Ok(resp.into_lyrics())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}
