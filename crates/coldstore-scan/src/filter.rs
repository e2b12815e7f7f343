//! Path exclusion rules.

use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use coldstore_core::{ScanConfig, ScanError, extension_of};

/// Compiled exclusion rules for one scan.
///
/// Directories are excluded by root-folder name or by pattern. Files are
/// excluded by pattern or by the extension allow-list.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    patterns: Vec<Regex>,
    root_folders: HashSet<String>,
    extensions: Option<HashSet<String>>,
}

impl ExclusionFilter {
    /// Compile the rules of `config`.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        Ok(Self {
            patterns: compile_patterns(&config.exclude_patterns)?,
            root_folders: config.excluded_root_folders.iter().cloned().collect(),
            extensions: config
                .normalized_extensions()
                .map(|list| list.into_iter().collect()),
        })
    }

    /// Decide whether a directory below `root` is skipped.
    ///
    /// The root itself is never excluded.
    pub fn should_exclude_dir(&self, path: &Path, root: &Path) -> bool {
        if path == root {
            return false;
        }
        if path.parent() == Some(root) {
            if let Some(name) = path.file_name() {
                if self.root_folders.contains(name.to_string_lossy().as_ref()) {
                    return true;
                }
            }
        }
        self.matches_pattern(path)
    }

    /// Decide whether a file is left out of the catalog.
    pub fn should_exclude_file(&self, path: &Path, name: &str) -> bool {
        if self.matches_pattern(path) {
            return true;
        }
        match &self.extensions {
            Some(allowed) => !allowed.contains(&extension_of(name)),
            None => false,
        }
    }

    /// Check the full path against every exclusion pattern.
    pub fn matches_pattern(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.patterns.iter().any(|re| re.is_match(&text))
    }

    /// Whether an extension allow-list is active.
    pub fn has_allow_list(&self) -> bool {
        self.extensions.is_some()
    }
}

/// Compile exclusion patterns, case-insensitively.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ScanError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ScanError::invalid_pattern(pattern.as_str(), e))
        })
        .collect()
}
