//! Collection downloads -- expand a catalog entity and run each member track.

use futures::stream::{self, StreamExt};

use crate::catalog::{CatalogEntity, EntityKind};
use crate::error::Result;
use crate::expander::Collection;
use crate::types::{BatchContext, BatchSummary, DownloadMode, Outcome, TrackId};

use super::TrackDownloader;

impl TrackDownloader {
    /// Run every track of an expanded collection
    ///
    /// Tracks run with at most `download.max_concurrent_tracks` in flight.
    /// Outcomes are returned in completion order; counters go to the current
    /// batch, which the caller closes with [`finish`](Self::finish).
    pub async fn download_collection(
        &self,
        mode: DownloadMode,
        collection: &Collection,
    ) -> Vec<Outcome> {
        let concurrency = self.config.download.max_concurrent_tracks.max(1);

        stream::iter(collection.track_ids.iter().enumerate())
            .map(|(index, id)| {
                let batch = collection.batch.at_position(index);
                async move { self.download_track(mode, id, &batch).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }

    /// Download a lone track as a batch of one
    pub async fn download_single(&self, id: &TrackId) -> BatchSummary {
        self.download_track(DownloadMode::Single, id, &BatchContext::single())
            .await;
        self.finish().await
    }

    /// Download every track of an album
    pub async fn download_album(&self, album_id: &str) -> Result<BatchSummary> {
        let collection = self.expander.album(album_id).await?;
        self.run_batch(DownloadMode::Album, vec![collection]).await
    }

    /// Download every track of a playlist
    pub async fn download_playlist(&self, playlist_id: &str) -> Result<BatchSummary> {
        let collection = self.expander.playlist(playlist_id).await?;
        self.run_batch(DownloadMode::Playlist, vec![collection])
            .await
    }

    /// Download every album of an artist
    pub async fn download_artist(&self, artist_id: &str) -> Result<BatchSummary> {
        let collections = self.expander.artist(artist_id).await?;
        self.run_batch(DownloadMode::Album, collections).await
    }

    /// Download the account's saved tracks
    pub async fn download_saved_tracks(&self) -> Result<BatchSummary> {
        let collection = self.expander.saved_tracks().await?;
        self.run_batch(DownloadMode::Single, vec![collection]).await
    }

    /// Download the discography of every followed artist
    pub async fn download_followed_artists(&self) -> Result<BatchSummary> {
        let collections = self.expander.followed_artists().await?;
        self.run_batch(DownloadMode::FollowedArtist, collections)
            .await
    }

    /// Download whatever a share URL or URI points at
    pub async fn download_link(&self, link: &str) -> Result<BatchSummary> {
        let entity = CatalogEntity::parse(link)?;
        tracing::info!(kind = ?entity.kind, id = %entity.id, "downloading link");

        match entity.kind {
            EntityKind::Track => Ok(self.download_single(&TrackId::new(entity.id)).await),
            EntityKind::Album => self.download_album(&entity.id).await,
            EntityKind::Playlist => self.download_playlist(&entity.id).await,
            EntityKind::Artist => self.download_artist(&entity.id).await,
        }
    }

    /// Fix the batch total, run every collection, then close the batch.
    ///
    /// Expansion happens before this is called, so an expansion error leaves
    /// the counters untouched.
    async fn run_batch(
        &self,
        mode: DownloadMode,
        collections: Vec<Collection>,
    ) -> Result<BatchSummary> {
        let total: usize = collections.iter().map(|c| c.track_ids.len()).sum();
        let progress = self.current_progress().await;
        if !progress.init(total) {
            tracing::warn!(total, "batch counters already initialized, keeping earlier total");
        }

        for collection in &collections {
            let outcomes = self.download_collection(mode, collection).await;
            tracing::debug!(
                album = ?collection.batch.album_name,
                playlist = ?collection.batch.playlist_name,
                tracks = outcomes.len(),
                "collection finished"
            );
        }

        Ok(self.finish().await)
    }
}
