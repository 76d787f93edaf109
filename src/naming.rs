//! Output path resolution
//!
//! Turns a [`TrackDescriptor`] plus its [`BatchContext`] into a [`PathSet`]
//! using the configured folder/filename templates, then resolves filename
//! collisions against what is already on disk and what other in-flight tracks
//! have claimed in the same directory.

use crate::config::{Config, NamingConfig};
use crate::dedup::{DedupIndex, DirectoryGuard};
use crate::error::{Error, Result};
use crate::types::{BatchContext, DownloadMode, PathSet, TrackDescriptor};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Characters stripped from every substituted value
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '\'', '<', '>', '"'];

/// Maximum number of suffixes tried when resolving a collision
const MAX_SUFFIX_ATTEMPTS: u32 = 9999;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{([^{}]*)\}").expect("valid regex")
});

/// Strip filesystem-unsafe characters and replace `|` with `-`
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c))
        .map(|c| if c == '|' { '-' } else { c })
        .collect()
}

/// Expand `{name}` placeholders in `template`
///
/// Values are sanitized before substitution. A blank template expands to an
/// empty string. `key` names the config field for error reporting.
pub fn expand_template(
    template: &str,
    key: &str,
    values: &HashMap<&'static str, String>,
) -> Result<String> {
    if template.trim().is_empty() {
        return Ok(String::new());
    }

    if let Some(unknown) = PLACEHOLDER_RE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .find(|name| !values.contains_key(name.as_str()))
    {
        return Err(Error::config(
            key,
            format!("unknown placeholder {{{unknown}}} in template \"{template}\""),
        ));
    }

    Ok(PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            values
                .get(&caps[1])
                .map(|v| sanitize(v))
                .unwrap_or_default()
        })
        .into_owned())
}

/// Path components of an expanded template that stay below the root
///
/// Blank segments and `.`/`..` are dropped, so a value that sanitizes to
/// nothing cannot turn the path absolute.
fn relative_components(expanded: &str) -> Vec<&str> {
    expanded
        .split('/')
        .filter(|part| !part.trim().is_empty() && *part != "." && *part != "..")
        .collect()
}

/// Result of path resolution for one track
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Paths to use for this attempt
    pub paths: PathSet,
    /// The templated final path exists on disk with a non-zero size
    pub exists_by_name: bool,
    /// The track is recorded in the directory's index
    pub exists_by_id: bool,
}

/// Computes final and temporary paths from the naming templates
#[derive(Clone, Debug)]
pub struct NamingResolver {
    root: PathBuf,
    naming: NamingConfig,
    extension: &'static str,
    temp_dir: Option<PathBuf>,
}

impl NamingResolver {
    /// Create a resolver from the run configuration
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.download.root_path.clone(),
            naming: config.naming.clone(),
            extension: config.download.format.extension(),
            temp_dir: config.download.temp_download_dir.clone(),
        }
    }

    fn placeholder_values(
        track: &TrackDescriptor,
        batch: &BatchContext,
    ) -> HashMap<&'static str, String> {
        let album = batch
            .album_name
            .clone()
            .unwrap_or_else(|| track.album.clone());
        let release_year = batch
            .release_year
            .clone()
            .unwrap_or_else(|| track.release_year.clone());

        HashMap::from([
            ("artist", track.primary_artist().to_string()),
            ("album", album),
            ("title", track.title.clone()),
            ("track_number", format!("{:02}", track.track_number)),
            ("disc_number", track.disc_number.to_string()),
            ("release_year", release_year),
            (
                "playlist_name",
                batch.playlist_name.clone().unwrap_or_default(),
            ),
        ])
    }

    /// Templated final path, before collision handling
    pub fn final_path(
        &self,
        track: &TrackDescriptor,
        batch: &BatchContext,
        mode: DownloadMode,
    ) -> Result<PathBuf> {
        let values = Self::placeholder_values(track, batch);
        let n = &self.naming;

        let has_album = !values.get("album").is_none_or(|a| a.is_empty());
        let (folder, folder_key, file, file_key) = match mode {
            DownloadMode::Playlist => (
                &n.playlist_folder,
                "naming.playlist_folder",
                &n.playlist_track,
                "naming.playlist_track",
            ),
            DownloadMode::Album | DownloadMode::FollowedArtist if has_album => (
                &n.album_folder,
                "naming.album_folder",
                &n.album_track,
                "naming.album_track",
            ),
            _ => (
                &n.single_folder,
                "naming.single_folder",
                &n.single_track,
                "naming.single_track",
            ),
        };

        let subfolder = expand_template(folder, folder_key, &values)?;
        let filename = expand_template(file, file_key, &values)?;

        let mut directory = self.root.clone();
        directory.extend(relative_components(&subfolder));
        let mut file_parts = relative_components(&filename);
        let Some(stem) = file_parts.pop() else {
            return Err(Error::config(
                file_key,
                format!("template \"{file}\" produced an empty filename"),
            ));
        };
        directory.extend(file_parts);

        Ok(directory.join(format!("{}.{}", stem, self.extension)))
    }

    /// Resolve the full [`PathSet`] for a track and claim its final path
    ///
    /// Collision rule: when the templated file already exists with a non-zero
    /// size and the track is not recorded in that directory (or another
    /// in-flight track already claimed the name), `_<n>` is appended to the
    /// stem, where `n` starts one past the number of files named `<stem>_*`.
    /// The claim must be released through [`DedupIndex::release_claim`] once
    /// the track reaches a terminal state.
    pub async fn resolve(
        &self,
        track: &TrackDescriptor,
        batch: &BatchContext,
        mode: DownloadMode,
        dedup: &DedupIndex,
    ) -> Result<Resolution> {
        let templated = self.final_path(track, batch, mode)?;
        let directory = templated
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        let mut guard = dedup.lock_directory(&directory).await?;

        let exists_by_name = tokio::fs::metadata(&templated)
            .await
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        let exists_by_id = guard.contains(&track.id);

        let final_path = if (exists_by_name && !exists_by_id) || guard.is_claimed(&templated) {
            let renamed = next_free_name(&templated, &guard).await?;
            debug!(
                track_id = %track.id,
                original = ?templated,
                renamed = ?renamed,
                "filename collision, using suffixed name"
            );
            renamed
        } else {
            templated
        };

        guard.claim(final_path.clone());

        let temp_path = match &self.temp_dir {
            Some(temp_dir) => temp_dir.join(format!(
                "dl_{:016x}_{}.{}",
                rand::random::<u64>(),
                track.id,
                self.extension
            )),
            None => final_path.clone(),
        };

        Ok(Resolution {
            paths: PathSet {
                final_path,
                temp_path,
                directory,
            },
            exists_by_name,
            exists_by_id,
        })
    }
}

/// First `<stem>_<n>.<ext>` not present on disk nor claimed
async fn next_free_name(path: &Path, guard: &DirectoryGuard) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::Other(format!("cannot extract file stem from {path:?}")))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let directory = guard.directory();

    let prefix = format!("{stem}_");
    let mut existing = 0u32;
    match tokio::fs::read_dir(directory).await {
        Ok(mut entries) => {
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_name().to_string_lossy().starts_with(&prefix) {
                    existing += 1;
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    for n in (existing + 1)..=(existing + MAX_SUFFIX_ATTEMPTS) {
        let name = match extension {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = directory.join(name);
        if !guard.is_claimed(&candidate) && !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(Error::Other(format!(
        "could not find a free name for {path:?} after {MAX_SUFFIX_ATTEMPTS} attempts"
    )))
}
