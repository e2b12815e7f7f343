//! Directory and file record types.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::category::FileCategory;

/// Stable index of a directory inside a [`DirArena`](crate::DirArena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirId(pub u32);

impl DirId {
    /// Create a new DirId from a raw index.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Creation time, or the modification time where the platform has none.
    pub created: DateTime<Utc>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: DateTime<Utc>) -> Self {
        Self {
            modified,
            created: modified,
        }
    }

    /// Build from raw metadata times.
    pub fn from_system(modified: Option<SystemTime>, created: Option<SystemTime>) -> Self {
        let modified: DateTime<Utc> = modified
            .map(DateTime::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let created = created.map(DateTime::from).unwrap_or(modified);
        Self { modified, created }
    }
}

/// Per-directory counters over direct contents only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirMetadata {
    /// Depth below the scan root.
    pub depth: u32,
    /// Number of files directly in this directory.
    pub file_count: u64,
    /// Number of directories directly in this directory.
    pub subdirectory_count: u64,
    /// Combined size of the direct files.
    pub total_size: u64,
}

impl DirMetadata {
    /// Create empty metadata at the given depth.
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }
}

/// A cataloged file, owned by exactly one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name (not full path).
    pub name: CompactString,
    /// Absolute path.
    #[serde(with = "crate::paths::lossy")]
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    /// Relative path of the owning directory ("" for the root).
    pub parent_directory: String,
    /// Lowercased extension including the dot, or "".
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Category derived from the extension.
    #[serde(rename = "type")]
    pub category: FileCategory,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Creation time.
    pub created: DateTime<Utc>,
}

impl FileRecord {
    /// Build a record for a file found in the directory at `parent_directory`.
    pub fn new(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        parent_directory: &str,
        size: u64,
        timestamps: Timestamps,
    ) -> Self {
        let name = name.into();
        let extension = extension_of(&name);
        Self {
            relative_path: join_relative(parent_directory, &name),
            parent_directory: parent_directory.to_string(),
            category: FileCategory::from_extension(&extension),
            extension,
            path: path.into(),
            name,
            size,
            modified: timestamps.modified,
            created: timestamps.created,
        }
    }
}

/// A directory in the scan arena.
///
/// Children are referenced by id; the arena owns every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirNode {
    /// Index of this node in its arena.
    pub id: DirId,
    /// Directory name (not full path).
    pub name: CompactString,
    /// Absolute path.
    #[serde(with = "crate::paths::lossy")]
    pub path: PathBuf,
    /// Path relative to the scan root, "" for the root.
    pub relative_path: String,
    /// Parent node, None for the root.
    pub parent: Option<DirId>,
    /// Relative path of the parent, None for the root.
    pub parent_path: Option<String>,
    /// Depth below the scan root.
    pub depth: u32,
    /// Child directories by name.
    pub children: IndexMap<CompactString, DirId>,
    /// Files directly in this directory.
    pub files: Vec<FileRecord>,
    /// Direct content counters.
    pub metadata: DirMetadata,
}

impl DirNode {
    pub(crate) fn new_root(id: DirId, name: impl Into<CompactString>, path: PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            relative_path: String::new(),
            parent: None,
            parent_path: None,
            depth: 0,
            children: IndexMap::new(),
            files: Vec::new(),
            metadata: DirMetadata::new(0),
        }
    }

    pub(crate) fn new_child(id: DirId, parent: &DirNode, name: &str, path: PathBuf) -> Self {
        let depth = parent.depth + 1;
        Self {
            id,
            name: name.into(),
            path,
            relative_path: join_relative(&parent.relative_path, name),
            parent: Some(parent.id),
            parent_path: Some(parent.relative_path.clone()),
            depth,
            children: IndexMap::new(),
            files: Vec::new(),
            metadata: DirMetadata::new(depth),
        }
    }

    /// Check whether this is the scan root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Get the number of direct child directories.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Join a relative directory path and a name with `/`.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Lowercased extension of a file name including the dot, or "".
///
/// Dotfiles such as `.DS_Store` have no extension.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx..].to_lowercase(),
    }
}
