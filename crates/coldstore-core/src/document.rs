//! The serialized result of a completed scan.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::defaults::{SCANNER_NAME, SCANNER_VERSION};
use crate::error::ScanError;
use crate::node::{DirMetadata, FileRecord};
use crate::stats::Statistics;

/// Scan parameters recorded in the document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInfo {
    pub root_path: String,
    pub scan_date: DateTime<Utc>,
    pub scanner: String,
    pub version: String,
    pub max_depth: u32,
    pub include_extensions: Option<Vec<String>>,
    pub exclude_patterns: Vec<String>,
    /// Folder names skipped directly under the root.
    #[serde(default)]
    pub excluded_root_folders: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default)]
    pub resumed_from_checkpoint: bool,
}

impl ScanInfo {
    /// Header for a scan of `root` under `config`, dated now.
    pub fn new(root: &Path, config: &ScanConfig) -> Self {
        Self {
            root_path: root.to_string_lossy().into_owned(),
            scan_date: Utc::now(),
            scanner: SCANNER_NAME.to_string(),
            version: SCANNER_VERSION.to_string(),
            max_depth: config.max_depth,
            include_extensions: config.normalized_extensions(),
            exclude_patterns: config.exclude_patterns.clone(),
            excluded_root_folders: config.excluded_root_folders.clone(),
            follow_symlinks: config.follow_symlinks,
            resumed_from_checkpoint: false,
        }
    }
}

/// Type tag of a tree node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Directory,
}

/// A directory in the nested document form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    pub name: String,
    #[serde(with = "crate::paths::lossy")]
    pub path: PathBuf,
    pub relative_path: String,
    pub parent_path: Option<String>,
    pub depth: u32,
    #[serde(default)]
    pub children: IndexMap<String, TreeNode>,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    pub metadata: DirMetadata,
}

impl TreeNode {
    /// Visit this node and every descendant, parents before children.
    pub fn walk(&self) -> impl Iterator<Item = &TreeNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.values().rev());
            Some(node)
        })
    }

    /// Number of files in this subtree.
    pub fn total_files(&self) -> u64 {
        self.walk().map(|n| n.files.len() as u64).sum()
    }

    /// Number of directories strictly below this node.
    pub fn total_directories(&self) -> u64 {
        self.walk().count() as u64 - 1
    }

    /// Deepest node in this subtree.
    pub fn deepest(&self) -> u32 {
        self.walk().map(|n| n.depth).max().unwrap_or(self.depth)
    }
}

/// Complete output of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub scan_info: ScanInfo,
    pub statistics: Statistics,
    pub tree: TreeNode,
}

impl TreeDocument {
    /// Check the structural guarantees of a completed scan.
    pub fn validate(&self) -> Result<(), ScanError> {
        let max_depth = self.scan_info.max_depth;
        for node in self.tree.walk() {
            if node.depth > max_depth {
                return Err(invalid(format!(
                    "directory '{}' at depth {} exceeds max depth {max_depth}",
                    node.relative_path, node.depth
                )));
            }
            if node.metadata.file_count != node.files.len() as u64 {
                return Err(invalid(format!(
                    "directory '{}' reports {} files but lists {}",
                    node.relative_path,
                    node.metadata.file_count,
                    node.files.len()
                )));
            }
            if node.metadata.subdirectory_count != node.children.len() as u64 {
                return Err(invalid(format!(
                    "directory '{}' reports {} subdirectories but lists {}",
                    node.relative_path,
                    node.metadata.subdirectory_count,
                    node.children.len()
                )));
            }
        }

        let files = self.tree.total_files();
        if files != self.statistics.total_files {
            return Err(invalid(format!(
                "statistics count {} files but the tree holds {files}",
                self.statistics.total_files
            )));
        }
        let dirs = self.tree.total_directories();
        if dirs != self.statistics.total_directories {
            return Err(invalid(format!(
                "statistics count {} directories but the tree holds {dirs}",
                self.statistics.total_directories
            )));
        }
        Ok(())
    }

    /// Write pretty JSON to `path` through a temp file and rename.
    pub fn write_to(&self, path: &Path) -> Result<(), ScanError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;
        }

        let tmp_path = temp_path_for(path);
        {
            let file = File::create(&tmp_path).map_err(|e| ScanError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
                ScanError::Serialization {
                    path: tmp_path.clone(),
                    source,
                }
            })?;
            writer.flush().map_err(|e| ScanError::io(&tmp_path, e))?;
        }
        fs::rename(&tmp_path, path).map_err(|e| ScanError::io(path, e))?;

        tracing::debug!(path = %path.display(), "wrote tree document");
        Ok(())
    }

    /// Read a document previously written by [`TreeDocument::write_to`].
    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ScanError::Serialization {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Sibling temp file used for atomic replacement of `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn invalid(message: String) -> ScanError {
    ScanError::InvalidDocument { message }
}
