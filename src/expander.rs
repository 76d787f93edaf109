//! Collection expansion
//!
//! Albums, playlists, artist discographies, saved tracks and followed artists
//! are turned into ordered lists of track identifiers plus the
//! [`BatchContext`] their tracks are named with. Any page failure aborts the
//! whole expansion; partial lists are never returned.

use crate::catalog::{CatalogApi, PAGE_LIMIT, Page, TrackRef};
use crate::error::{MetadataError, Result};
use crate::types::{BatchContext, TrackId};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Track identifiers of one collection with its shared naming context
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    /// Context passed to every track of the collection
    pub batch: BatchContext,
    /// Member tracks in collection order
    pub track_ids: Vec<TrackId>,
}

impl Collection {
    fn from_refs(mut batch: BatchContext, refs: Vec<TrackRef>) -> Self {
        let track_ids: Vec<TrackId> = refs.into_iter().filter_map(|r| r.id).collect();
        batch.total_tracks = track_ids.len();
        Self { batch, track_ids }
    }
}

/// Accumulate pages until the declared total is reached
///
/// `first` is the page already in hand. Further pages are requested with
/// `offset = items fetched so far`.
pub async fn collect_pages<T, F, Fut>(id: &str, first: Page<T>, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let total = first.total;
    let mut items = first.items;

    while items.len() < total {
        let page = fetch(items.len()).await?;
        if page.items.is_empty() {
            return Err(MetadataError::IncompletePage {
                id: id.to_string(),
                fetched: items.len(),
                total,
            }
            .into());
        }
        items.extend(page.items);
    }

    items.truncate(total);
    Ok(items)
}

/// Expands catalog collections into track lists
#[derive(Clone)]
pub struct EntityExpander {
    catalog: Arc<dyn CatalogApi>,
}

impl EntityExpander {
    /// Create an expander over `catalog`
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self { catalog }
    }

    /// Every track of an album
    pub async fn album(&self, album_id: &str) -> Result<Collection> {
        let info = self.catalog.album(album_id).await?;
        let refs = collect_pages(album_id, info.tracks, |offset| {
            self.catalog.album_tracks(album_id, offset, PAGE_LIMIT)
        })
        .await?;

        debug!(album_id, tracks = refs.len(), "expanded album");
        Ok(Collection::from_refs(
            BatchContext {
                album_id: Some(info.id),
                album_name: Some(info.name),
                release_year: Some(info.release_year),
                ..Default::default()
            },
            refs,
        ))
    }

    /// Every track of a playlist
    ///
    /// Entries without an identifier (local files, removed tracks) are dropped.
    pub async fn playlist(&self, playlist_id: &str) -> Result<Collection> {
        let info = self.catalog.playlist(playlist_id).await?;
        let refs = collect_pages(playlist_id, info.tracks, |offset| {
            self.catalog
                .playlist_tracks(playlist_id, offset, PAGE_LIMIT)
        })
        .await?;

        debug!(playlist_id, tracks = refs.len(), "expanded playlist");
        Ok(Collection::from_refs(
            BatchContext {
                playlist_id: Some(info.id),
                playlist_name: Some(info.name),
                ..Default::default()
            },
            refs,
        ))
    }

    /// Every album of an artist, each expanded
    pub async fn artist(&self, artist_id: &str) -> Result<Vec<Collection>> {
        let first = self.catalog.artist_albums(artist_id, 0, PAGE_LIMIT).await?;
        let albums = collect_pages(artist_id, first, |offset| {
            self.catalog.artist_albums(artist_id, offset, PAGE_LIMIT)
        })
        .await?;

        info!(artist_id, albums = albums.len(), "expanding discography");
        let mut collections = Vec::with_capacity(albums.len());
        for album in albums {
            collections.push(self.album(&album.id).await?);
        }
        Ok(collections)
    }

    /// The account's saved tracks
    ///
    /// Pages of 50 are requested until one comes back short.
    pub async fn saved_tracks(&self) -> Result<Collection> {
        let mut refs = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.catalog.saved_tracks(offset, PAGE_LIMIT).await?;
            let len = page.items.len();
            refs.extend(page.items);
            offset += PAGE_LIMIT;
            if len < PAGE_LIMIT {
                break;
            }
        }
        debug!(tracks = refs.len(), "expanded saved tracks");
        Ok(Collection::from_refs(BatchContext::default(), refs))
    }

    /// Discographies of every followed artist
    pub async fn followed_artists(&self) -> Result<Vec<Collection>> {
        let artists = self.catalog.followed_artists().await?;
        info!(artists = artists.len(), "expanding followed artists");
        let mut collections = Vec::new();
        for artist_id in artists {
            collections.extend(self.artist(&artist_id).await?);
        }
        Ok(collections)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackRef;
    use crate::downloader::test_helpers::{FakeCatalog, track_refs};
    use crate::error::Error;
    use std::sync::atomic::Ordering;

    fn expander(catalog: FakeCatalog) -> (EntityExpander, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        (EntityExpander::new(catalog.clone()), catalog)
    }

    #[tokio::test]
    async fn album_pagination_fetches_ceil_total_over_50_pages() {
        for total in [0usize, 1, 49, 50, 51, 100, 101, 237] {
            let (expander, catalog) =
                expander(FakeCatalog::default().with_album("al", "Record", track_refs("t", total)));

            let collection = expander.album("al").await.unwrap();

            assert_eq!(collection.track_ids.len(), total, "total={total}");
            let fetches = catalog.header_calls.load(Ordering::SeqCst)
                + catalog.page_calls.load(Ordering::SeqCst);
            let expected = if total == 0 { 1 } else { total.div_ceil(50) };
            assert_eq!(fetches, expected, "total={total}");
        }
    }

    #[tokio::test]
    async fn album_order_and_context_are_kept() {
        let (expander, _) =
            expander(FakeCatalog::default().with_album("al", "Record", track_refs("t", 60)));

        let collection = expander.album("al").await.unwrap();
        assert_eq!(collection.track_ids[0], TrackId::from("t1"));
        assert_eq!(collection.track_ids[59], TrackId::from("t60"));
        assert_eq!(collection.batch.total_tracks, 60);
        assert_eq!(collection.batch.album_name.as_deref(), Some("Record"));
        assert_eq!(collection.batch.release_year.as_deref(), Some("2020"));
    }

    #[tokio::test]
    async fn page_failure_aborts_expansion() {
        let mut catalog = FakeCatalog::default().with_album("al", "Record", track_refs("t", 120));
        catalog.fail_pages_from = Some(100);
        let (expander, _) = expander(catalog);

        let err = expander.album("al").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Metadata(MetadataError::BadStatus { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn empty_page_before_total_is_an_error() {
        let first = Page {
            items: vec![TrackRef::new("a")],
            total: 3,
        };
        let err = collect_pages("x", first, |_| async {
            Ok(Page::<TrackRef> {
                items: vec![],
                total: 3,
            })
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Metadata(MetadataError::IncompletePage {
                fetched: 1,
                total: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn playlist_drops_entries_without_id() {
        let mut refs = track_refs("p", 3);
        refs.insert(1, TrackRef { id: None });
        let (expander, _) = expander(FakeCatalog::default().with_playlist("pl", "Mix", refs));

        let collection = expander.playlist("pl").await.unwrap();
        assert_eq!(collection.track_ids.len(), 3);
        assert_eq!(collection.batch.total_tracks, 3);
        assert_eq!(collection.batch.playlist_name.as_deref(), Some("Mix"));
    }

    #[tokio::test]
    async fn artist_expands_each_album() {
        let (expander, _) = expander(
            FakeCatalog::default()
                .with_artist("ar", &[("a1", "First"), ("a2", "Second")])
                .with_album("a1", "First", track_refs("x", 2))
                .with_album("a2", "Second", track_refs("y", 3)),
        );

        let collections = expander.artist("ar").await.unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[0].batch.album_name.as_deref(), Some("First"));
        assert_eq!(collections[1].track_ids.len(), 3);
    }

    #[tokio::test]
    async fn saved_tracks_stop_on_short_page() {
        let mut catalog = FakeCatalog::default();
        catalog.saved = track_refs("s", 120);
        let (expander, catalog) = expander(catalog);

        let collection = expander.saved_tracks().await.unwrap();
        assert_eq!(collection.track_ids.len(), 120);
        assert_eq!(catalog.page_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn saved_tracks_exact_multiple_needs_one_empty_page() {
        let mut catalog = FakeCatalog::default();
        catalog.saved = track_refs("s", 100);
        let (expander, catalog) = expander(catalog);

        let collection = expander.saved_tracks().await.unwrap();
        assert_eq!(collection.track_ids.len(), 100);
        assert_eq!(catalog.page_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn followed_artists_expand_every_discography() {
        let mut catalog = FakeCatalog::default()
            .with_artist("ar1", &[("a1", "One")])
            .with_artist("ar2", &[("a2", "Two")])
            .with_album("a1", "One", track_refs("x", 1))
            .with_album("a2", "Two", track_refs("y", 2));
        catalog.followed = vec!["ar1".into(), "ar2".into()];
        let (expander, _) = expander(catalog);

        let collections = expander.followed_artists().await.unwrap();
        let total: usize = collections.iter().map(|c| c.track_ids.len()).sum();
        assert_eq!(total, 3);
    }
}
