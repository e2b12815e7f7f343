//! Durable snapshots of an in-progress scan.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coldstore_core::{DirArena, ScanError, ScanInfo, Statistics, temp_path_for};

/// Schema version of [`CheckpointState`]. Snapshots of any other version
/// are ignored.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Everything needed to continue an interrupted scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub version: u32,
    /// Canonical scan root.
    #[serde(with = "coldstore_core::paths::lossy")]
    pub root: PathBuf,
    /// When the first attempt of this scan started.
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// Directories whose listing has been fully committed.
    #[serde(with = "coldstore_core::paths::lossy_set")]
    pub visited: BTreeSet<PathBuf>,
    /// Canonical paths of every directory in the arena, for symlink dedup.
    #[serde(with = "coldstore_core::paths::lossy_set")]
    pub real_paths: BTreeSet<PathBuf>,
    pub arena: DirArena,
    pub statistics: Statistics,
    pub scan_info: ScanInfo,
}

impl CheckpointState {
    /// Fresh state for a scan of `root` starting now.
    pub fn new(root: impl Into<PathBuf>, scan_info: ScanInfo) -> Self {
        let root = root.into();
        let now = Utc::now();
        Self {
            version: CHECKPOINT_VERSION,
            arena: DirArena::new(root.clone()),
            real_paths: BTreeSet::from([root.clone()]),
            root,
            started_at: now,
            saved_at: now,
            visited: BTreeSet::new(),
            statistics: Statistics::new(),
            scan_info,
        }
    }
}

/// Just enough of a snapshot to decide whether it is usable.
#[derive(Deserialize)]
struct CheckpointHeader {
    version: u32,
    root: PathBuf,
}

/// Reads and writes the checkpoint artifact of one output target.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an artifact is present on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write `state` atomically: a crash mid-write leaves the previous
    /// snapshot intact.
    pub fn save(&self, state: &CheckpointState) -> Result<(), ScanError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
        }

        let tmp_path = temp_path_for(&self.path);
        {
            let file = File::create(&tmp_path).map_err(|e| ScanError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, state).map_err(|source| {
                ScanError::Serialization {
                    path: tmp_path.clone(),
                    source,
                }
            })?;
            writer.flush().map_err(|e| ScanError::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| ScanError::io(&self.path, e))?;
        Ok(())
    }

    /// Load the snapshot for a scan of `root`.
    ///
    /// Never fails: a missing, unreadable, malformed, foreign-version or
    /// foreign-root snapshot is reported as `None`. So is one whose arena
    /// breaks the [`DirArena::check`] rules or is rooted elsewhere.
    pub fn load(&self, root: &Path) -> Option<CheckpointState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot read checkpoint, starting fresh");
                return None;
            }
        };

        let header: CheckpointHeader = match serde_json::from_slice(&bytes) {
            Ok(header) => header,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "malformed checkpoint, starting fresh");
                return None;
            }
        };
        if header.version != CHECKPOINT_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                found = header.version,
                expected = CHECKPOINT_VERSION,
                "checkpoint version mismatch, starting fresh"
            );
            return None;
        }
        if header.root != root {
            tracing::warn!(
                path = %self.path.display(),
                checkpoint_root = %header.root.display(),
                "checkpoint belongs to another root, starting fresh"
            );
            return None;
        }

        let state: CheckpointState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "malformed checkpoint, starting fresh");
                return None;
            }
        };
        if state.arena.root_path() != root {
            tracing::warn!(
                path = %self.path.display(),
                arena_root = %state.arena.root_path().display(),
                "checkpoint arena is rooted elsewhere, starting fresh"
            );
            return None;
        }
        Some(state)
    }

    /// Delete the artifact. A missing artifact is not an error.
    pub fn clear(&self) -> Result<(), ScanError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ScanError::io(&self.path, err)),
        }
    }
}
