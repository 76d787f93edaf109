//! Lyrics sidecar files
//!
//! Unsynced lyrics are written one line per lyric to a `.txt` file next to the
//! audio file. Line-synced lyrics are written in LRC form (`[mm:ss.cc]text`)
//! to a `.lrc` file.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Whether lyric lines carry timestamps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LyricsSync {
    /// Plain text lines
    Unsynced,
    /// Each line starts at a known offset
    LineSynced,
}

/// One lyric line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LyricLine {
    /// Start offset in milliseconds
    pub start_ms: u64,
    /// Text of the line
    pub words: String,
}

/// Lyrics of a track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lyrics {
    /// Sync type
    pub sync: LyricsSync,
    /// Lines in playback order
    pub lines: Vec<LyricLine>,
}

impl Lyrics {
    /// Sidecar path for an audio file
    pub fn sidecar_path(&self, audio_path: &Path) -> PathBuf {
        match self.sync {
            LyricsSync::Unsynced => audio_path.with_extension("txt"),
            LyricsSync::LineSynced => audio_path.with_extension("lrc"),
        }
    }

    /// Render the sidecar contents
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if self.sync == LyricsSync::LineSynced {
                out.push_str(&format_timestamp(line.start_ms));
            }
            out.push_str(&line.words);
            out.push('\n');
        }
        out
    }

    /// Write the sidecar next to `audio_path`, returning its location
    pub async fn write_sidecar(&self, audio_path: &Path) -> Result<PathBuf> {
        let path = self.sidecar_path(audio_path);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(path)
    }
}

/// Format a millisecond offset as an LRC timestamp
///
/// The fraction is the first two digits of the millisecond remainder, so
/// `65432` becomes `[01:05.43]` and `1070` becomes `[00:01.70]`.
pub fn format_timestamp(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = (ms % 1000).to_string();
    let centis: String = millis.chars().take(2).collect();
    format!("[{:02}:{:02}.{:0>2}]", minutes, seconds, centis)
}
