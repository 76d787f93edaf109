//! Error types for track-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Metadata, Stream, PostProcess)
//! - A crate-wide [`Error`] with conversions from I/O, HTTP and JSON errors
//! - Context information (track ID, file path, stage)
//!
//! Skip outcomes (unplayable, already downloaded) are not errors. The pipeline
//! reports them through [`Outcome`](crate::types::Outcome) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for track-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for track-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "naming.album_track")
        key: Option<String>,
    },

    /// Remote metadata lookup returned malformed or incomplete data
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Content stream failure during transfer
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// Post-processing error (convert, tag, cover art, move)
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unrecognized catalog URL or URI
    #[error("invalid catalog link: {0}")]
    InvalidLink(String),

    /// External tool execution failed (ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Metadata lookup errors
///
/// Fatal for the track being processed. No file is created when one of these
/// is raised.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The response did not contain the expected top-level object
    #[error("empty response for {id}")]
    EmptyResponse {
        /// The identifier that was looked up
        id: String,
    },

    /// A required field was absent or null
    #[error("missing field `{field}` in metadata for {id}")]
    MissingField {
        /// The identifier that was looked up
        id: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// The remote service responded with a non-success status
    #[error("request for {url} failed with status {status}")]
    BadStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Collection pagination could not complete
    #[error("pagination of {id} stopped at {fetched} of {total} items")]
    IncompletePage {
        /// Collection identifier
        id: String,
        /// Items fetched before the failure
        fetched: usize,
        /// Declared total
        total: usize,
    },
}

/// Content stream errors
///
/// Fatal for the track; any partial temp file is removed by the pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The content stream could not be opened
    #[error("failed to open content stream for {id}: {reason}")]
    OpenFailed {
        /// Track identifier
        id: String,
        /// Reason reported by the provider
        reason: String,
    },

    /// A read from the content stream failed mid-transfer
    #[error("read failed after {bytes_read} bytes: {reason}")]
    ReadFailed {
        /// Bytes successfully read before the failure
        bytes_read: u64,
        /// Reason reported by the provider
        reason: String,
    },
}

/// Post-processing errors (conversion, tagging, cover art, final move)
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// The transcoder ran but reported failure
    #[error("conversion of {path} failed: {reason}")]
    ConversionFailed {
        /// File being converted
        path: PathBuf,
        /// Transcoder output or exit status
        reason: String,
    },

    /// Writing tags to the audio file failed
    #[error("tagging {path} failed: {reason}")]
    TaggingFailed {
        /// Audio file
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// Fetching or writing the cover art image failed
    #[error("cover art for {path} failed: {reason}")]
    CoverArtFailed {
        /// Target image path
        path: PathBuf,
        /// Reason for the failure
        reason: String,
    },

    /// The service has no lyrics for the track
    #[error("lyrics not available for {id}")]
    LyricsUnavailable {
        /// Track identifier
        id: String,
    },

    /// Moving the working file into its final location failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// Working file
        source_path: PathBuf,
        /// Final destination
        dest_path: PathBuf,
        /// Reason for the failure
        reason: String,
    },
}
