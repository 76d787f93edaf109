//! Core types for track-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque canonical key for a single playable audio item
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// Create a new TrackId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw artist record attached to a track, used for genre lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    /// Artist identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// API URL of the full artist object
    pub href: Option<String>,
}

/// Full metadata for one track, as fetched for a single attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Canonical identifier returned by the lookup
    pub id: TrackId,
    /// Artist names, primary first
    pub artists: Vec<String>,
    /// Album name
    pub album: String,
    /// Track title
    pub title: String,
    /// Release year (first component of the album release date)
    pub release_year: String,
    /// Disc number
    pub disc_number: u32,
    /// Track number on the disc
    pub track_number: u32,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Whether the service allows playback of this track
    pub is_playable: bool,
    /// Largest cover art image
    pub cover_art_url: Option<String>,
    /// Raw artist records
    pub raw_artists: Vec<ArtistRef>,
}

impl TrackDescriptor {
    /// Primary artist name (empty when the service lists none)
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

/// Parent metadata shared by every track of a batch
///
/// Owned by the caller and passed by reference into each pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchContext {
    /// Number of tracks in the batch
    pub total_tracks: usize,
    /// Album identifier when expanding an album
    pub album_id: Option<String>,
    /// Album name override
    pub album_name: Option<String>,
    /// Playlist identifier when expanding a playlist
    pub playlist_id: Option<String>,
    /// Playlist name used by playlist templates
    pub playlist_name: Option<String>,
    /// Zero-padded position of the track inside the collection
    pub position: Option<String>,
    /// Release year override
    pub release_year: Option<String>,
}

impl BatchContext {
    /// Context for a lone track download
    pub fn single() -> Self {
        Self {
            total_tracks: 1,
            ..Default::default()
        }
    }

    /// Copy of this context with the collection position set
    pub fn at_position(&self, index: usize) -> Self {
        Self {
            position: Some(format!("{:02}", index + 1)),
            ..self.clone()
        }
    }

    /// Key/value pairs reported alongside failures
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("total_tracks", self.total_tracks.to_string())];
        let optional = [
            ("album_id", &self.album_id),
            ("album", &self.album_name),
            ("playlist_id", &self.playlist_id),
            ("playlist_name", &self.playlist_name),
            ("position", &self.position),
            ("release_year", &self.release_year),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                fields.push((key, v.clone()));
            }
        }
        fields
    }
}

/// Which template family a track is named with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Track of an album download
    Album,
    /// Track of a playlist download
    Playlist,
    /// A single track requested on its own
    Single,
    /// Track reached through a followed artist's discography
    FollowedArtist,
}

/// Final, temporary and parent paths for one track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSet {
    /// Where the finished file lives
    pub final_path: PathBuf,
    /// Where the stream is written while processing
    pub temp_path: PathBuf,
    /// Directory holding `final_path`
    pub directory: PathBuf,
}

impl PathSet {
    /// Whether the working file must be moved at the end
    pub fn needs_move(&self) -> bool {
        self.temp_path != self.final_path
    }

    /// Filename component of the final path
    pub fn file_name(&self) -> String {
        self.final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Pipeline stage, used to attribute failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Metadata lookup
    Metadata,
    /// Path resolution
    Naming,
    /// Content streaming
    Stream,
    /// Transcoding
    Convert,
    /// Final move and archival
    Archive,
}

/// Terminal result of one pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// File written, tagged and recorded
    Downloaded {
        /// Canonical identifier
        id: TrackId,
        /// Final file location
        path: PathBuf,
    },
    /// The service marks the track unplayable
    SkippedUnplayable,
    /// Already present in the output directory
    SkippedExists,
    /// Already present in the global archive
    SkippedPreviouslyDownloaded,
    /// The track could not be delivered
    Failed {
        /// Stage at which the run stopped
        stage: Stage,
        /// Human-readable reason
        reason: String,
    },
}

impl Outcome {
    /// Counter this outcome increments
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Downloaded { .. } => OutcomeKind::Downloaded,
            Outcome::SkippedUnplayable
            | Outcome::SkippedExists
            | Outcome::SkippedPreviouslyDownloaded => OutcomeKind::Skipped,
            Outcome::Failed { .. } => OutcomeKind::Failed,
        }
    }

    /// Skip reason, if this is a skip
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Outcome::SkippedUnplayable => Some("track is unavailable"),
            Outcome::SkippedExists => Some("track already exists"),
            Outcome::SkippedPreviouslyDownloaded => Some("track already downloaded once"),
            _ => None,
        }
    }
}

/// The three batch counters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    /// Delivered
    Downloaded,
    /// Skipped for any reason
    Skipped,
    /// Failed
    Failed,
}

/// Final counters of a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Tracks announced for the batch
    pub total: usize,
    /// Tracks delivered
    pub downloaded: usize,
    /// Tracks skipped
    pub skipped: usize,
    /// Tracks failed
    pub failed: usize,
}

impl BatchSummary {
    /// Number of tracks with a terminal outcome
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Download Summary:")?;
        writeln!(f, "Total tracks: {}", self.total)?;
        writeln!(f, "Successfully downloaded: {}", self.downloaded)?;
        writeln!(f, "Skipped: {}", self.skipped)?;
        write!(f, "Failed: {}", self.failed)
    }
}

/// Event emitted during track processing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Pipeline started for a track
    TrackStarted {
        /// Identifier as supplied by the caller
        id: TrackId,
    },

    /// Streaming started
    Streaming {
        /// Canonical identifier
        id: TrackId,
        /// Declared stream size in bytes
        total_bytes: u64,
    },

    /// Transcoder was not available, raw stream kept
    ConversionSkipped {
        /// Canonical identifier
        id: TrackId,
        /// Reason for skipping
        reason: String,
    },

    /// A recoverable tag, cover art or lyrics problem
    TaggingFailed {
        /// Canonical identifier
        id: TrackId,
        /// Error message
        error: String,
    },

    /// Track delivered
    TrackDownloaded {
        /// Canonical identifier
        id: TrackId,
        /// Final path
        path: PathBuf,
    },

    /// Track skipped
    TrackSkipped {
        /// Identifier
        id: TrackId,
        /// Reason for skipping
        reason: String,
    },

    /// Track failed
    TrackFailed {
        /// Identifier
        id: TrackId,
        /// Stage where failure occurred
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Batch finished
    BatchComplete {
        /// Final counters
        summary: BatchSummary,
    },
}
