//! Audio transcoding through an external encoder
//!
//! The pipeline only transcodes when the configured format has a codec other
//! than `copy`. A missing encoder is not fatal: [`NoOpTranscoder`] reports
//! [`Error::NotSupported`] and the caller keeps the raw stream.

use crate::config::{AudioFormat, Quality, ToolsConfig};
use crate::error::{Error, PostProcessError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

/// Codec and bitrate for one conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Encoder codec name
    pub codec: &'static str,
    /// Target bitrate
    pub bitrate: &'static str,
}

impl TranscodeRequest {
    /// Conversion needed for `format`, or `None` when the stream is kept as is
    pub fn for_format(format: AudioFormat, quality: Quality, elevated: bool) -> Option<Self> {
        if !format.needs_transcode() {
            return None;
        }
        Some(Self {
            codec: format.codec(),
            bitrate: quality.bitrate(elevated),
        })
    }

    /// Encoder arguments converting `input` into `output`
    pub fn ffmpeg_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(["-c:a", self.codec, "-b:a", self.bitrate].map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

/// Converts a raw stream file into the target container
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `input` into `output`
    ///
    /// Returns [`Error::NotSupported`] when no encoder is available.
    async fn convert(&self, input: &Path, output: &Path, request: &TranscodeRequest)
    -> Result<()>;

    /// Implementation name for logging
    fn name(&self) -> &'static str;
}

/// Transcoder backed by the `ffmpeg` binary
pub struct FfmpegTranscoder {
    binary_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Use an explicit binary
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Look for `ffmpeg` in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn convert(
        &self,
        input: &Path,
        output: &Path,
        request: &TranscodeRequest,
    ) -> Result<()> {
        debug!(
            input = ?input,
            output = ?output,
            codec = request.codec,
            bitrate = request.bitrate,
            "running ffmpeg"
        );
        let result = Command::new(&self.binary_path)
            .args(request.ffmpeg_args(input, output))
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::NotSupported(format!(
                    "ffmpeg not found at {}",
                    self.binary_path.display()
                )),
                _ => Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)),
            })?;

        if !result.status.success() {
            return Err(PostProcessError::ConversionFailed {
                path: output.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Transcoder used when no encoder is installed
pub struct NoOpTranscoder;

#[async_trait]
impl Transcoder for NoOpTranscoder {
    async fn convert(
        &self,
        _input: &Path,
        _output: &Path,
        request: &TranscodeRequest,
    ) -> Result<()> {
        Err(Error::NotSupported(format!(
            "{} conversion requires ffmpeg. Configure tools.ffmpeg_path or ensure ffmpeg is in PATH.",
            request.codec
        )))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Pick a transcoder according to the tool settings
pub fn from_config(tools: &ToolsConfig) -> Arc<dyn Transcoder> {
    let transcoder: Arc<dyn Transcoder> = if let Some(ref path) = tools.ffmpeg_path {
        Arc::new(FfmpegTranscoder::new(path.clone()))
    } else if tools.search_path {
        FfmpegTranscoder::from_path()
            .map(|t| Arc::new(t) as Arc<dyn Transcoder>)
            .unwrap_or_else(|| Arc::new(NoOpTranscoder))
    } else {
        Arc::new(NoOpTranscoder)
    };
    info!(transcoder = transcoder.name(), "transcoder initialized");
    transcoder
}
