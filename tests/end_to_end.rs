//! End-to-end tests: catalog over HTTP (wiremock), in-memory content streams,
//! real filesystem.

mod common;

use common::{audio_bytes, downloader, test_config, track_json};
use serde_json::json;
use track_dl::{Event, TrackId};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn mount_album(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/albums/al1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "al1",
            "name": "Blue",
            "release_date": "2019-05-01",
            "artists": [{"name": "Band"}],
            "tracks": {
                "items": [{"id": "t1"}, {"id": "t2"}, {"id": "t3"}],
                "total": 3
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("ids", "t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "tracks": [track_json("t1", "Opening", 1, true)] })),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("ids", "t2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "tracks": [track_json("t2", "Locked", 2, false)] })),
        )
        .mount(server)
        .await;

    // Album object missing: malformed metadata
    Mock::given(method("GET"))
        .and(path("/tracks"))
        .and(query_param("ids", "t3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tracks": [{
                "id": "t3",
                "name": "Broken",
                "artists": [{"id": "band-1", "name": "Band"}],
                "disc_number": 1,
                "track_number": 3,
                "duration_ms": 1000,
                "is_playable": true
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn album_with_unplayable_and_malformed_tracks() {
    let server = MockServer::start().await;
    mount_album(&server).await;
    let (config, temp) = test_config();
    let downloader = downloader(&server, config);
    let mut events = downloader.subscribe();

    let summary = downloader.download_album("al1").await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.downloaded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);

    let delivered = temp
        .path()
        .join("Music")
        .join("Band")
        .join("Blue")
        .join("01. Opening.ogg");
    assert_eq!(
        tokio::fs::read(&delivered).await.unwrap(),
        audio_bytes(&TrackId::from("t1"))
    );

    let mut downloaded = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            Event::TrackDownloaded { id, .. } => downloaded.push(id),
            Event::TrackSkipped { id, reason } => skipped.push((id, reason)),
            Event::TrackFailed { id, error, .. } => failed.push((id, error)),
            _ => {}
        }
    }
    assert_eq!(downloaded, vec![TrackId::from("t1")]);
    assert_eq!(
        skipped,
        vec![(TrackId::from("t2"), "track is unavailable".to_string())]
    );
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, TrackId::from("t3"));
    assert!(failed[0].1.contains("album"), "error: {}", failed[0].1);
}

#[tokio::test]
async fn rerunning_an_album_never_downloads_twice() {
    let server = MockServer::start().await;
    mount_album(&server).await;
    let (config, temp) = test_config();
    let downloader = downloader(&server, config);

    downloader.download_album("al1").await.unwrap();
    let delivered = temp
        .path()
        .join("Music")
        .join("Band")
        .join("Blue")
        .join("01. Opening.ogg");
    let first_modified = tokio::fs::metadata(&delivered)
        .await
        .unwrap()
        .modified()
        .unwrap();

    let summary = downloader.download_album("al1").await.unwrap();

    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 1);
    let second_modified = tokio::fs::metadata(&delivered)
        .await
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(first_modified, second_modified);
    assert!(
        !delivered.with_file_name("01. Opening_1.ogg").exists(),
        "a recorded track must not be renamed"
    );
}

fn playlist_items(range: std::ops::RangeInclusive<usize>) -> Vec<serde_json::Value> {
    range
        .map(|i| json!({ "track": { "id": format!("p{i}") } }))
        .collect()
}

#[tokio::test]
async fn large_playlist_is_paginated_and_fully_accounted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/playlists/pl1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pl1",
            "name": "Road Trip",
            "tracks": { "items": playlist_items(1..=50), "total": 120 }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlists/pl1/tracks"))
        .and(query_param("offset", "50"))
        .and(query_param("limit", "50"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": playlist_items(51..=100), "total": 120 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/playlists/pl1/tracks"))
        .and(query_param("offset", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "items": playlist_items(101..=120), "total": 120 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tracks"))
        .respond_with(|req: &Request| {
            let id = req
                .url
                .query_pairs()
                .find(|(key, _)| key == "ids")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            ResponseTemplate::new(200).set_body_json(
                json!({ "tracks": [track_json(&id, &format!("Song {id}"), 1, true)] }),
            )
        })
        .mount(&server)
        .await;

    let (mut config, temp) = test_config();
    config.download.max_concurrent_tracks = 8;
    let downloader = downloader(&server, config);

    let summary = downloader.download_playlist("pl1").await.unwrap();

    assert_eq!(summary.total, 120);
    assert_eq!(summary.processed(), 120);
    assert_eq!(summary.downloaded, 120);

    let dir = temp.path().join("Music").join("Road Trip");
    assert!(dir.join("Band - Song p1.ogg").exists());
    assert!(dir.join("Band - Song p120.ogg").exists());
    let ids = tokio::fs::read_to_string(dir.join(".song_ids"))
        .await
        .unwrap();
    assert_eq!(ids.lines().count(), 120);
}
