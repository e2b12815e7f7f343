//! Scan configuration types.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    self, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_INCLUDE_EXTENSIONS,
    DEFAULT_MAX_DEPTH, EXCLUDED_ROOT_FOLDERS,
};

/// Configuration for one catalog scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Where the tree document is written (None = derived from the root name).
    #[builder(default)]
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Maximum depth to traverse; the root is depth 0.
    #[builder(default = "DEFAULT_MAX_DEPTH")]
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Extension allow-list (None = include every file).
    #[builder(default = "Some(defaults::owned(DEFAULT_INCLUDE_EXTENSIONS))")]
    #[serde(default = "default_include_extensions")]
    pub include_extensions: Option<Vec<String>>,

    /// Regular expressions matched against full paths.
    #[builder(default = "defaults::owned(DEFAULT_EXCLUDE_PATTERNS)")]
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Folder names skipped when directly under the root.
    #[builder(default = "defaults::owned(EXCLUDED_ROOT_FOLDERS)")]
    #[serde(default = "default_excluded_root_folders")]
    pub excluded_root_folders: Vec<String>,

    /// Resume from a matching checkpoint when one exists.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Directories processed between checkpoints (0 = only at the end).
    #[builder(default = "DEFAULT_CHECKPOINT_INTERVAL")]
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Count directories up front so progress has a denominator.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub precount: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_checkpoint_interval() -> usize {
    DEFAULT_CHECKPOINT_INTERVAL
}

fn default_include_extensions() -> Option<Vec<String>> {
    Some(defaults::owned(DEFAULT_INCLUDE_EXTENSIONS))
}

fn default_exclude_patterns() -> Vec<String> {
    defaults::owned(DEFAULT_EXCLUDE_PATTERNS)
}

fn default_excluded_root_folders() -> Vec<String> {
    defaults::owned(EXCLUDED_ROOT_FOLDERS)
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        if let Some(Some(ref output)) = self.output {
            if output.as_os_str().is_empty() {
                return Err("Output path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config for scanning a path with every default.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            max_depth: DEFAULT_MAX_DEPTH,
            include_extensions: default_include_extensions(),
            exclude_patterns: default_exclude_patterns(),
            excluded_root_folders: default_excluded_root_folders(),
            resume: true,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            follow_symlinks: false,
            precount: true,
        }
    }

    /// Tree document location, derived from the root name when unset.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => PathBuf::from(format!("{}.json", safe_disk_name(&self.root))),
        }
    }

    /// Checkpoint location; a retried scan with the same output finds it.
    pub fn checkpoint_path(&self) -> PathBuf {
        let mut path = self.output_path().into_os_string();
        path.push(".checkpoint");
        PathBuf::from(path)
    }

    /// Allow-list lowercased and dot-prefixed, or None to include everything.
    ///
    /// An empty list counts as "include everything" too.
    pub fn normalized_extensions(&self) -> Option<Vec<String>> {
        let list = self.include_extensions.as_ref()?;
        if list.is_empty() {
            return None;
        }
        Some(list.iter().map(|ext| normalize_extension(ext)).collect())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Lowercase an extension and make sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// File-name-safe label for a disk root: its leaf name with every character
/// that is not alphanumeric, `-`, `_` or `.` replaced by `_`.
pub fn safe_disk_name(root: &Path) -> String {
    let leaf = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "UnknownDisk".to_string());

    leaf.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
