//! Configuration types for track-dl

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Download behavior configuration (directories, format, pacing, dedup policy)
///
/// Groups settings related to how tracks are fetched, stored, and skipped.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root output directory (default: "./Music")
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Scratch directory for working files (None = write in place)
    ///
    /// When set, each track is streamed to a randomized file here and moved
    /// to its final path only after post-processing succeeds.
    #[serde(default)]
    pub temp_download_dir: Option<PathBuf>,

    /// Output container/codec (default: ogg)
    #[serde(default)]
    pub format: AudioFormat,

    /// Requested quality tier (default: auto)
    #[serde(default)]
    pub quality: Quality,

    /// Bytes requested per read from the content stream (default: 20000)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Throttle streaming to approximate real-time playback (default: false)
    #[serde(default)]
    pub real_time: bool,

    /// Pause after each downloaded track (default: 0 = no pause)
    #[serde(default, with = "duration_serde")]
    pub bulk_wait_time: Duration,

    /// Skip tracks already recorded in the output directory (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Skip tracks recorded in the global archive (default: false)
    ///
    /// Also controls whether successful downloads are appended to the archive.
    #[serde(default)]
    pub skip_previously_downloaded: bool,

    /// Global archive location (default: `<root_path>/.song_archive`)
    #[serde(default)]
    pub archive_path: Option<PathBuf>,

    /// Maximum tracks processed concurrently within a batch (default: 1)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tracks: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            temp_download_dir: None,
            format: AudioFormat::default(),
            quality: Quality::default(),
            chunk_size: default_chunk_size(),
            real_time: false,
            bulk_wait_time: Duration::ZERO,
            skip_existing: true,
            skip_previously_downloaded: false,
            archive_path: None,
            max_concurrent_tracks: default_max_concurrent(),
        }
    }
}

impl DownloadConfig {
    /// Resolved location of the global archive file
    pub fn archive_file(&self) -> PathBuf {
        self.archive_path
            .clone()
            .unwrap_or_else(|| self.root_path.join(".song_archive"))
    }
}

/// Folder and filename templates
///
/// Placeholders use `{name}` syntax. Recognized names are `artist`, `album`,
/// `title`, `track_number`, `disc_number`, `release_year` and `playlist_name`.
/// Unknown placeholders are reported when a path is resolved, not when the
/// config is loaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Album folder (default: "{artist}/{album}")
    #[serde(default = "default_album_folder")]
    pub album_folder: String,

    /// Album track filename (default: "{track_number}. {title}")
    #[serde(default = "default_album_track")]
    pub album_track: String,

    /// Playlist folder (default: "{playlist_name}")
    #[serde(default = "default_playlist_folder")]
    pub playlist_folder: String,

    /// Playlist track filename (default: "{artist} - {title}")
    #[serde(default = "default_artist_title")]
    pub playlist_track: String,

    /// Single track folder (default: empty = root directory)
    #[serde(default)]
    pub single_folder: String,

    /// Single track filename (default: "{artist} - {title}")
    #[serde(default = "default_artist_title")]
    pub single_track: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            album_folder: default_album_folder(),
            album_track: default_album_track(),
            playlist_folder: default_playlist_folder(),
            playlist_track: default_artist_title(),
            single_folder: String::new(),
            single_track: default_artist_title(),
        }
    }
}

/// Tag, lyrics and cover art settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Write only the primary artist into the artist tag (default: false)
    #[serde(default)]
    pub only_main_artist_in_artist_tag: bool,

    /// Append "(feat. X, Y)" to titles with several artists (default: false)
    #[serde(default)]
    pub add_featured_artists_to_title: bool,

    /// Look up artist genres and write a genre tag (default: false)
    #[serde(default)]
    pub save_genres: bool,

    /// Keep every genre of every artist instead of the first one (default: false)
    #[serde(default)]
    pub all_genres: bool,

    /// Fetch lyrics and write a sidecar file (default: false)
    #[serde(default)]
    pub download_lyrics: bool,

    /// Place a cover art image in each output directory (default: true)
    #[serde(default = "default_true")]
    pub cover_art: bool,

    /// Cover art filename (default: "folder.jpg")
    #[serde(default = "default_cover_art_filename")]
    pub cover_art_filename: String,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            only_main_artist_in_artist_tag: false,
            add_featured_artists_to_title: false,
            save_genres: false,
            all_genres: false,
            download_lyrics: false,
            cover_art: true,
            cover_art_filename: default_cover_art_filename(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for ffmpeg if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Terminal presentation settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Draw the batch progress bar (default: true)
    #[serde(default = "default_true")]
    pub show_progress: bool,

    /// Draw the "fetching..." spinner (default: true)
    #[serde(default = "default_true")]
    pub show_spinner: bool,

    /// Capacity of the event broadcast channel (default: 1000)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            show_progress: true,
            show_spinner: true,
            event_capacity: default_event_capacity(),
        }
    }
}

/// Main configuration for [`TrackDownloader`](crate::TrackDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig): directories, format, quality, pacing, dedup policy
/// - [`naming`](NamingConfig): folder and filename templates
/// - [`tagging`](TaggingConfig): tags, lyrics, cover art
/// - [`tools`](ToolsConfig): external binary paths
/// - [`output`](OutputConfig): progress bar and spinner
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Folder and filename templates
    #[serde(default)]
    pub naming: NamingConfig,

    /// Tag, lyrics and cover art settings
    #[serde(default)]
    pub tagging: TaggingConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Presentation settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Root output directory
    pub fn root_path(&self) -> &PathBuf {
        &self.download.root_path
    }
}

/// Output container/codec
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    /// AAC via ffmpeg's native encoder
    Aac,
    /// AAC via libfdk_aac
    FdkAac,
    /// AAC in an m4a container
    M4a,
    /// MP3 via libmp3lame
    Mp3,
    /// Ogg Vorbis as delivered (no transcode)
    #[default]
    Ogg,
    /// Opus via libopus
    Opus,
    /// Vorbis as delivered (no transcode)
    Vorbis,
}

impl AudioFormat {
    /// ffmpeg audio codec name, `"copy"` when no transcode is needed
    pub fn codec(&self) -> &'static str {
        match self {
            AudioFormat::Aac | AudioFormat::M4a => "aac",
            AudioFormat::FdkAac => "libfdk_aac",
            AudioFormat::Mp3 => "libmp3lame",
            AudioFormat::Opus => "libopus",
            AudioFormat::Ogg | AudioFormat::Vorbis => "copy",
        }
    }

    /// File extension of the produced container
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Aac | AudioFormat::FdkAac | AudioFormat::M4a => "m4a",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg | AudioFormat::Opus | AudioFormat::Vorbis => "ogg",
        }
    }

    /// Whether the raw stream must go through the transcoder
    pub fn needs_transcode(&self) -> bool {
        self.codec() != "copy"
    }
}

/// Quality tier requested from the content stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// ~96 kbps
    Normal,
    /// ~160 kbps
    High,
    /// ~320 kbps (requires elevated account)
    VeryHigh,
    /// Best tier the account allows
    #[default]
    Auto,
}

impl Quality {
    /// Collapse `Auto` into a concrete tier for the given account
    pub fn resolve(self, elevated: bool) -> Quality {
        match self {
            Quality::Auto if elevated => Quality::VeryHigh,
            Quality::Auto => Quality::High,
            other => other,
        }
    }

    /// Transcoder bitrate for this tier
    pub fn bitrate(self, elevated: bool) -> &'static str {
        match self.resolve(elevated) {
            Quality::Normal => "96k",
            Quality::High => "160k",
            Quality::VeryHigh | Quality::Auto => "320k",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Quality::Normal => "normal",
            Quality::High => "high",
            Quality::VeryHigh => "very_high",
            Quality::Auto => "auto",
        };
        f.write_str(s)
    }
}

fn default_root_path() -> PathBuf {
    PathBuf::from("Music")
}

fn default_chunk_size() -> usize {
    20_000
}

fn default_max_concurrent() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_album_folder() -> String {
    "{artist}/{album}".into()
}

fn default_album_track() -> String {
    "{track_number}. {title}".into()
}

fn default_playlist_folder() -> String {
    "{playlist_name}".into()
}

fn default_artist_title() -> String {
    "{artist} - {title}".into()
}

fn default_cover_art_filename() -> String {
    "folder.jpg".into()
}

fn default_event_capacity() -> usize {
    1000
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("deserialize failed");

        assert_eq!(config.download.root_path, PathBuf::from("Music"));
        assert_eq!(config.download.chunk_size, 20_000);
        assert!(config.download.skip_existing);
        assert!(!config.download.skip_previously_downloaded);
        assert_eq!(config.download.format, AudioFormat::Ogg);
        assert_eq!(config.download.quality, Quality::Auto);
        assert_eq!(config.naming.album_folder, "{artist}/{album}");
        assert!(config.naming.single_folder.is_empty());
        assert_eq!(config.tagging.cover_art_filename, "folder.jpg");
        assert!(config.tools.search_path);
    }

    #[test]
    fn nested_fields_deserialize() {
        let json = r#"{
            "download": {
                "root_path": "/srv/music",
                "format": "mp3",
                "quality": "very_high",
                "bulk_wait_time": 2,
                "temp_download_dir": "/tmp/scratch"
            },
            "tagging": { "download_lyrics": true }
        }"#;
        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.download.format, AudioFormat::Mp3);
        assert_eq!(config.download.quality, Quality::VeryHigh);
        assert_eq!(config.download.bulk_wait_time, Duration::from_secs(2));
        assert_eq!(
            config.download.temp_download_dir,
            Some(PathBuf::from("/tmp/scratch"))
        );
        assert!(config.tagging.download_lyrics);
        assert!(config.tagging.cover_art, "untouched fields keep defaults");
    }

    #[test]
    fn archive_file_defaults_under_root() {
        let mut download = DownloadConfig {
            root_path: PathBuf::from("/music"),
            ..Default::default()
        };
        assert_eq!(download.archive_file(), PathBuf::from("/music/.song_archive"));

        download.archive_path = Some(PathBuf::from("/var/lib/archive"));
        assert_eq!(download.archive_file(), PathBuf::from("/var/lib/archive"));
    }

    // --- bitrate table ---

    #[test]
    fn bitrate_table_matches_quality_tiers() {
        assert_eq!(Quality::Normal.bitrate(false), "96k");
        assert_eq!(Quality::High.bitrate(false), "160k");
        assert_eq!(Quality::VeryHigh.bitrate(false), "320k");
        assert_eq!(Quality::Auto.bitrate(true), "320k");
        assert_eq!(Quality::Auto.bitrate(false), "160k");
    }

    #[test]
    fn explicit_tiers_ignore_account_level() {
        assert_eq!(Quality::High.bitrate(true), "160k");
        assert_eq!(Quality::Normal.resolve(true), Quality::Normal);
    }

    #[test]
    fn copy_formats_skip_transcode() {
        assert!(!AudioFormat::Ogg.needs_transcode());
        assert!(!AudioFormat::Vorbis.needs_transcode());
        assert!(AudioFormat::Mp3.needs_transcode());
        assert_eq!(AudioFormat::Opus.extension(), "ogg");
        assert_eq!(AudioFormat::FdkAac.extension(), "m4a");
    }
}
