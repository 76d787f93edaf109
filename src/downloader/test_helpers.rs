//! Shared test helpers: in-memory collaborators and a ready-made downloader.

use crate::catalog::{AlbumInfo, AlbumRef, CatalogApi, Page, PlaylistInfo, TrackRef};
use crate::config::{Config, Quality};
use crate::downloader::TrackDownloader;
use crate::error::{Error, MetadataError, Result, StreamError};
use crate::lyrics::Lyrics;
use crate::stream::{ContentStream, ContentStreamProvider, MemoryStream};
use crate::tagging::{TagWriter, TrackTags};
use crate::transcode::{TranscodeRequest, Transcoder};
use crate::types::{ArtistRef, TrackDescriptor, TrackId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Playable descriptor with one artist and a cover art URL
pub(crate) fn track(id: &str, title: &str) -> TrackDescriptor {
    TrackDescriptor {
        id: TrackId::from(id),
        artists: vec!["Artist".into()],
        album: "Album".into(),
        title: title.into(),
        release_year: "2020".into(),
        disc_number: 1,
        track_number: 1,
        duration_ms: 1_000,
        is_playable: true,
        cover_art_url: Some("https://images.test/cover.jpg".into()),
        raw_artists: vec![ArtistRef {
            id: "artist-1".into(),
            name: "Artist".into(),
            href: None,
        }],
    }
}

fn page_of<T: Clone>(items: &[T], offset: usize, limit: usize) -> Page<T> {
    Page {
        items: items.iter().skip(offset).take(limit).cloned().collect(),
        total: items.len(),
    }
}

/// Track refs `<prefix>1..=<n>`
pub(crate) fn track_refs(prefix: &str, n: usize) -> Vec<TrackRef> {
    (1..=n).map(|i| TrackRef::new(format!("{prefix}{i}"))).collect()
}

/// In-memory catalog with call counters
#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub(crate) tracks: HashMap<String, TrackDescriptor>,
    pub(crate) failing_tracks: HashSet<String>,
    pub(crate) albums: HashMap<String, (String, Vec<TrackRef>)>,
    pub(crate) playlists: HashMap<String, (String, Vec<TrackRef>)>,
    pub(crate) artist_albums: HashMap<String, Vec<AlbumRef>>,
    pub(crate) saved: Vec<TrackRef>,
    pub(crate) followed: Vec<String>,
    pub(crate) genres: HashMap<String, Vec<String>>,
    pub(crate) lyrics: HashMap<String, Lyrics>,
    pub(crate) cover: Option<Vec<u8>>,
    /// Offset at which page requests start failing
    pub(crate) fail_pages_from: Option<usize>,
    pub(crate) header_calls: AtomicUsize,
    pub(crate) page_calls: AtomicUsize,
    pub(crate) track_calls: AtomicUsize,
    pub(crate) cover_calls: AtomicUsize,
}

impl FakeCatalog {
    pub(crate) fn with_track(mut self, desc: TrackDescriptor) -> Self {
        self.tracks.insert(desc.id.0.clone(), desc);
        self
    }

    /// Lookup of `requested` returns `desc` (canonicalization)
    pub(crate) fn with_redirect(mut self, requested: &str, desc: TrackDescriptor) -> Self {
        self.tracks.insert(requested.to_string(), desc);
        self
    }

    pub(crate) fn with_failing_track(mut self, id: &str) -> Self {
        self.failing_tracks.insert(id.to_string());
        self
    }

    pub(crate) fn with_album(mut self, id: &str, name: &str, tracks: Vec<TrackRef>) -> Self {
        self.albums.insert(id.to_string(), (name.to_string(), tracks));
        self
    }

    pub(crate) fn with_playlist(mut self, id: &str, name: &str, tracks: Vec<TrackRef>) -> Self {
        self.playlists
            .insert(id.to_string(), (name.to_string(), tracks));
        self
    }

    pub(crate) fn with_artist(mut self, id: &str, albums: &[(&str, &str)]) -> Self {
        self.artist_albums.insert(
            id.to_string(),
            albums
                .iter()
                .map(|(id, name)| AlbumRef {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    pub(crate) fn with_cover(mut self, bytes: &[u8]) -> Self {
        self.cover = Some(bytes.to_vec());
        self
    }

    fn check_page(&self, id: &str, offset: usize) -> Result<()> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pages_from.is_some_and(|from| offset >= from) {
            return Err(MetadataError::BadStatus {
                url: format!("fake://{id}?offset={offset}"),
                status: 500,
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn track(&self, id: &TrackId) -> Result<TrackDescriptor> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_tracks.contains(id.as_str()) {
            return Err(MetadataError::MissingField {
                id: id.to_string(),
                field: "album",
            }
            .into());
        }
        self.tracks
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| MetadataError::EmptyResponse { id: id.to_string() }.into())
    }

    async fn album(&self, id: &str) -> Result<AlbumInfo> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        let (name, tracks) = self
            .albums
            .get(id)
            .ok_or_else(|| Error::Other(format!("no album {id}")))?;
        Ok(AlbumInfo {
            id: id.to_string(),
            name: name.clone(),
            artist: "Artist".into(),
            release_year: "2020".into(),
            tracks: page_of(tracks, 0, crate::catalog::PAGE_LIMIT),
        })
    }

    async fn album_tracks(&self, id: &str, offset: usize, limit: usize) -> Result<Page<TrackRef>> {
        let (_, tracks) = self
            .albums
            .get(id)
            .ok_or_else(|| Error::Other(format!("no album {id}")))?;
        self.check_page(id, offset)?;
        Ok(page_of(tracks, offset, limit))
    }

    async fn playlist(&self, id: &str) -> Result<PlaylistInfo> {
        self.header_calls.fetch_add(1, Ordering::SeqCst);
        let (name, tracks) = self
            .playlists
            .get(id)
            .ok_or_else(|| Error::Other(format!("no playlist {id}")))?;
        Ok(PlaylistInfo {
            id: id.to_string(),
            name: name.clone(),
            tracks: page_of(tracks, 0, crate::catalog::PAGE_LIMIT),
        })
    }

    async fn playlist_tracks(
        &self,
        id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<TrackRef>> {
        let (_, tracks) = self
            .playlists
            .get(id)
            .ok_or_else(|| Error::Other(format!("no playlist {id}")))?;
        self.check_page(id, offset)?;
        Ok(page_of(tracks, offset, limit))
    }

    async fn artist_albums(&self, id: &str, offset: usize, limit: usize) -> Result<Page<AlbumRef>> {
        let albums = self.artist_albums.get(id).cloned().unwrap_or_default();
        self.check_page(id, offset)?;
        Ok(page_of(&albums, offset, limit))
    }

    async fn saved_tracks(&self, offset: usize, limit: usize) -> Result<Page<TrackRef>> {
        self.check_page("saved", offset)?;
        Ok(page_of(&self.saved, offset, limit))
    }

    async fn followed_artists(&self) -> Result<Vec<String>> {
        Ok(self.followed.clone())
    }

    async fn artist_genres(&self, artist: &ArtistRef) -> Result<Vec<String>> {
        Ok(self.genres.get(&artist.id).cloned().unwrap_or_default())
    }

    async fn lyrics(&self, id: &TrackId) -> Result<Option<Lyrics>> {
        Ok(self.lyrics.get(id.as_str()).cloned())
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.cover_calls.fetch_add(1, Ordering::SeqCst);
        self.cover
            .clone()
            .ok_or_else(|| Error::Other(format!("no bytes behind {url}")))
    }
}

/// Stream that yields some bytes and then errors
struct BrokenStream {
    size: u64,
    sent: bool,
}

#[async_trait]
impl ContentStream for BrokenStream {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_chunk(&mut self, max: usize) -> Result<Vec<u8>> {
        if !self.sent {
            self.sent = true;
            return Ok(vec![7u8; max.min(self.size as usize / 2)]);
        }
        Err(StreamError::ReadFailed {
            bytes_read: self.size / 2,
            reason: "connection reset".into(),
        }
        .into())
    }
}

/// Content provider serving fixed bytes per track
#[derive(Default)]
pub(crate) struct FakeStreams {
    pub(crate) elevated: bool,
    pub(crate) fail_open: HashSet<String>,
    pub(crate) fail_read: HashSet<String>,
    pub(crate) opened: Mutex<Vec<(TrackId, Quality)>>,
}

impl FakeStreams {
    /// Audio bytes served for `id`
    pub(crate) fn payload(id: &TrackId) -> Vec<u8> {
        format!("audio-bytes-for-{id}").repeat(64).into_bytes()
    }

    pub(crate) fn opened_ids(&self) -> Vec<TrackId> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl ContentStreamProvider for FakeStreams {
    async fn open(&self, id: &TrackId, quality: Quality) -> Result<Box<dyn ContentStream>> {
        self.opened.lock().unwrap().push((id.clone(), quality));
        if self.fail_open.contains(id.as_str()) {
            return Err(StreamError::OpenFailed {
                id: id.to_string(),
                reason: "not licensed".into(),
            }
            .into());
        }
        let data = Self::payload(id);
        if self.fail_read.contains(id.as_str()) {
            return Ok(Box::new(BrokenStream {
                size: data.len() as u64,
                sent: false,
            }));
        }
        Ok(Box::new(MemoryStream::new(data)))
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }
}

/// How [`FakeTranscoder`] behaves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TranscodeMode {
    /// Copy input to output
    Succeed,
    /// Report the encoder as missing
    Unavailable,
    /// Leave a directory at the output path, then report the encoder as missing
    UnavailableWithBlockedOutput,
    /// Fail the conversion
    Fail,
}

pub(crate) struct FakeTranscoder {
    pub(crate) mode: TranscodeMode,
    pub(crate) requests: Mutex<Vec<TranscodeRequest>>,
}

impl FakeTranscoder {
    pub(crate) fn new(mode: TranscodeMode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        request: &TranscodeRequest,
    ) -> Result<()> {
        self.requests.lock().unwrap().push(*request);
        match self.mode {
            TranscodeMode::Succeed => {
                let mut data = tokio::fs::read(input).await?;
                data.extend_from_slice(b"-converted");
                tokio::fs::write(output, data).await?;
                Ok(())
            }
            TranscodeMode::Unavailable => Err(Error::NotSupported("no encoder".into())),
            TranscodeMode::UnavailableWithBlockedOutput => {
                tokio::fs::create_dir(output).await?;
                Err(Error::NotSupported("no encoder".into()))
            }
            TranscodeMode::Fail => Err(Error::ExternalTool("encoder crashed".into())),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Tag writer that records what it was asked to write
#[derive(Default)]
pub(crate) struct RecordingTagWriter {
    pub(crate) fail: bool,
    pub(crate) written: Mutex<Vec<(PathBuf, TrackTags)>>,
}

#[async_trait]
impl TagWriter for RecordingTagWriter {
    async fn write(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        if self.fail {
            return Err(crate::error::PostProcessError::TaggingFailed {
                path: path.to_path_buf(),
                reason: "unsupported container".into(),
            }
            .into());
        }
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), tags.clone()));
        Ok(())
    }
}

/// Config rooted in a fresh temp dir with terminal output disabled
pub(crate) fn test_config() -> (Config, TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.root_path = temp.path().join("Music");
    config.output.show_progress = false;
    config.output.show_spinner = false;
    (config, temp)
}

/// Collaborators for a test downloader
pub(crate) struct Fakes {
    pub(crate) catalog: Arc<FakeCatalog>,
    pub(crate) streams: Arc<FakeStreams>,
    pub(crate) transcoder: Arc<FakeTranscoder>,
    pub(crate) tags: Arc<RecordingTagWriter>,
}

impl Fakes {
    pub(crate) fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            streams: Arc::new(FakeStreams::default()),
            transcoder: Arc::new(FakeTranscoder::new(TranscodeMode::Succeed)),
            tags: Arc::new(RecordingTagWriter::default()),
        }
    }

    pub(crate) fn downloader(&self, config: Config) -> TrackDownloader {
        TrackDownloader::with_transcoder(
            config,
            self.catalog.clone(),
            self.streams.clone(),
            self.transcoder.clone(),
            self.tags.clone(),
        )
    }
}
