//! Duplicate bookkeeping at two scopes
//!
//! Every output directory carries a `.song_ids` file listing the tracks that
//! were materialized into it; a global archive file lists every track ever
//! downloaded. Both are append-only, one tab-separated record per line:
//!
//! ```text
//! <track id>\t<timestamp>\t<primary artist>\t<title>\t<filename>
//! ```
//!
//! Access to a directory is serialized through [`DirectoryGuard`], which also
//! tracks paths claimed by tracks still in flight so that two concurrent
//! tracks never pick the same final filename.

use crate::error::Result;
use crate::types::TrackId;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Name of the per-directory record file
pub const SONG_IDS_FILE: &str = ".song_ids";

/// Fields stored for each materialized track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupRecord {
    /// Canonical track identifier
    pub id: TrackId,
    /// Stored filename (no directory)
    pub filename: String,
    /// Primary artist
    pub artist: String,
    /// Track title
    pub title: String,
}

impl DedupRecord {
    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\n",
            clean(self.id.as_str()),
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            clean(&self.artist),
            clean(&self.title),
            clean(&self.filename),
        )
    }
}

fn clean(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// Read the identifiers of a record file (missing file = empty)
async fn load_ids(path: &Path) -> Result<HashSet<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents
            .lines()
            .filter_map(|line| line.split('\t').next())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e.into()),
    }
}

async fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Per-directory state held behind the directory lock
#[derive(Default)]
pub struct DirectoryState {
    ids: Option<HashSet<String>>,
    claims: HashSet<PathBuf>,
}

/// Exclusive access to one output directory's records
pub struct DirectoryGuard {
    directory: PathBuf,
    state: OwnedMutexGuard<DirectoryState>,
}

impl DirectoryGuard {
    /// Directory this guard serializes
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether `id` is recorded for this directory
    pub fn contains(&self, id: &TrackId) -> bool {
        self.state
            .ids
            .as_ref()
            .is_some_and(|ids| ids.contains(id.as_str()))
    }

    /// Whether another in-flight track has reserved `path`
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.state.claims.contains(path)
    }

    /// Reserve `path` until [`release`](Self::release) is called
    pub fn claim(&mut self, path: PathBuf) {
        self.state.claims.insert(path);
    }

    /// Drop a reservation
    pub fn release(&mut self, path: &Path) {
        self.state.claims.remove(path);
    }

    /// Append a record to this directory's `.song_ids` file
    pub async fn record(&mut self, record: &DedupRecord) -> Result<()> {
        append_line(&self.directory.join(SONG_IDS_FILE), &record.to_line()).await?;
        self.state
            .ids
            .get_or_insert_with(HashSet::new)
            .insert(record.id.0.clone());
        debug!(
            track_id = %record.id,
            directory = ?self.directory,
            "recorded track in directory index"
        );
        Ok(())
    }
}

/// Directory-scoped and global duplicate index
pub struct DedupIndex {
    archive_path: PathBuf,
    global: Mutex<Option<HashSet<String>>>,
    directories: Mutex<HashMap<PathBuf, Arc<Mutex<DirectoryState>>>>,
}

impl DedupIndex {
    /// Create an index whose global archive lives at `archive_path`
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            global: Mutex::new(None),
            directories: Mutex::new(HashMap::new()),
        }
    }

    /// Location of the global archive
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Lock a directory, loading its records on first use
    ///
    /// Every check-then-act sequence on a directory (collision suffixing,
    /// recording) must happen while holding the returned guard.
    pub async fn lock_directory(&self, directory: &Path) -> Result<DirectoryGuard> {
        let slot = {
            let mut dirs = self.directories.lock().await;
            dirs.entry(directory.to_path_buf()).or_default().clone()
        };
        let mut state = slot.lock_owned().await;
        if state.ids.is_none() {
            state.ids = Some(load_ids(&directory.join(SONG_IDS_FILE)).await?);
        }
        Ok(DirectoryGuard {
            directory: directory.to_path_buf(),
            state,
        })
    }

    /// True if `id` is recorded for `directory`
    pub async fn exists_in_directory(&self, directory: &Path, id: &TrackId) -> Result<bool> {
        Ok(self.lock_directory(directory).await?.contains(id))
    }

    /// True if `id` is recorded in the global archive
    pub async fn exists_globally(&self, id: &TrackId) -> Result<bool> {
        let mut global = self.global.lock().await;
        if global.is_none() {
            *global = Some(load_ids(&self.archive_path).await?);
        }
        Ok(global.as_ref().is_some_and(|ids| ids.contains(id.as_str())))
    }

    /// Append a record to `directory`'s store
    pub async fn record(&self, directory: &Path, record: &DedupRecord) -> Result<()> {
        self.lock_directory(directory).await?.record(record).await
    }

    /// Append a record to the global archive
    pub async fn record_global(&self, record: &DedupRecord) -> Result<()> {
        let mut global = self.global.lock().await;
        append_line(&self.archive_path, &record.to_line()).await?;
        global
            .get_or_insert_with(HashSet::new)
            .insert(record.id.0.clone());
        debug!(track_id = %record.id, "recorded track in global archive");
        Ok(())
    }

    /// Release a path claimed during resolution
    pub async fn release_claim(&self, directory: &Path, path: &Path) -> Result<()> {
        self.lock_directory(directory).await?.release(path);
        Ok(())
    }
}
