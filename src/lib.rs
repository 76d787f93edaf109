//! # track-dl
//!
//! Track download orchestration engine for catalog-based music services.
//!
//! ## Design Philosophy
//!
//! track-dl is designed to be:
//! - **Batch-safe** - One bad track never aborts an album, playlist or discography
//! - **Idempotent** - Re-running a download skips what is already on disk
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Authentication and the audio content protocol belong to the embedding
//! application: it supplies a [`CatalogApi`] (or uses [`HttpCatalog`] with a
//! bearer token) and a [`ContentStreamProvider`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use track_dl::{Config, ContentStreamProvider, HttpCatalog, TrackDownloader};
//!
//! async fn run(streams: Arc<dyn ContentStreamProvider>) -> track_dl::Result<()> {
//!     let mut config = Config::default();
//!     config.download.root_path = "/srv/music".into();
//!
//!     let catalog = Arc::new(HttpCatalog::new("access-token"));
//!     let downloader = TrackDownloader::new(config, catalog, streams);
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = downloader
//!         .download_link("https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy")
//!         .await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote catalog access and link parsing
pub mod catalog;
/// Configuration types
pub mod config;
/// Duplicate bookkeeping (per-directory and global)
pub mod dedup;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Collection expansion into track lists
pub mod expander;
/// Lyrics sidecar files
pub mod lyrics;
/// Output path resolution
pub mod naming;
/// Real-time stream pacing
pub mod pacing;
/// Batch counters and terminal indicators
pub mod progress;
/// Content stream capability
pub mod stream;
/// Audio tag writing and cover art
pub mod tagging;
/// Format conversion through an external encoder
pub mod transcode;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::{CatalogApi, CatalogEntity, EntityKind, HttpCatalog};
pub use config::{AudioFormat, Config, Quality};
pub use dedup::{DedupIndex, DedupRecord};
pub use downloader::TrackDownloader;
pub use error::{Error, MetadataError, PostProcessError, Result, StreamError};
pub use expander::{Collection, EntityExpander};
pub use stream::{ContentStream, ContentStreamProvider, MemoryStream};
pub use tagging::{LoftyTagWriter, TagWriter, TrackTags};
pub use transcode::{FfmpegTranscoder, NoOpTranscoder, TranscodeRequest, Transcoder};
pub use types::{
    ArtistRef, BatchContext, BatchSummary, DownloadMode, Event, Outcome, OutcomeKind, PathSet,
    Stage, TrackDescriptor, TrackId,
};
