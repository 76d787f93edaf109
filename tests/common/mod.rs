//! Common test utilities for track-dl integration tests

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use track_dl::{
    Config, ContentStream, ContentStreamProvider, HttpCatalog, LoftyTagWriter, MemoryStream,
    NoOpTranscoder, Quality, Result, TrackDownloader, TrackId,
};
use wiremock::MockServer;

/// Content provider that serves deterministic bytes for every track
pub struct MemoryStreams;

#[async_trait]
impl ContentStreamProvider for MemoryStreams {
    async fn open(&self, id: &TrackId, _quality: Quality) -> Result<Box<dyn ContentStream>> {
        Ok(Box::new(MemoryStream::new(audio_bytes(id))))
    }

    fn is_elevated(&self) -> bool {
        false
    }
}

/// Bytes served for `id`
pub fn audio_bytes(id: &TrackId) -> Vec<u8> {
    format!("fake-audio-{id};").repeat(100).into_bytes()
}

/// Track object as returned by the catalog's track lookup
pub fn track_json(id: &str, title: &str, number: u32, playable: bool) -> Value {
    json!({
        "id": id,
        "name": title,
        "artists": [{"id": "band-1", "name": "Band"}],
        "album": {
            "name": "Blue",
            "release_date": "2019-05-01",
            "images": []
        },
        "disc_number": 1,
        "track_number": number,
        "duration_ms": 180000,
        "is_playable": playable
    })
}

/// Config rooted in a fresh temp dir with terminal output disabled
pub fn test_config() -> (Config, TempDir) {
    let temp = tempfile::tempdir().expect("create temp dir");
    let mut config = Config::default();
    config.download.root_path = temp.path().join("Music");
    config.output.show_progress = false;
    config.output.show_spinner = false;
    config.tagging.cover_art = false;
    (config, temp)
}

/// Downloader talking to the mock catalog, without an encoder
pub fn downloader(server: &MockServer, config: Config) -> TrackDownloader {
    let catalog = Arc::new(HttpCatalog::with_base_urls(
        server.uri(),
        format!("{}/lyrics", server.uri()),
        "test-token",
    ));
    TrackDownloader::with_transcoder(
        config,
        catalog,
        Arc::new(MemoryStreams),
        Arc::new(NoOpTranscoder),
        Arc::new(LoftyTagWriter),
    )
}
