//! Human-oriented summary of a scanned disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use coldstore_core::{ScanInfo, Statistics, TreeDocument, TreeNode};

use crate::error::IndexError;

/// Trees deeper than this get a recommendation.
pub const DEEP_TREE_THRESHOLD: u32 = 6;

/// Disks with more files than this get a recommendation.
pub const LARGE_DISK_THRESHOLD: u64 = 100_000;

/// Date-like digit runs; eight digits are tried first so `20210314` is not
/// read as a six digit date.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{8}|\d{6}").expect("Invalid date regex"));

/// Shape of the directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureAnalysis {
    /// Names of the directories directly under the root.
    pub root_directories: Vec<String>,
    /// Deepest level reached below the root.
    pub total_depth: u32,
    /// Directory name frequencies, most common first.
    pub common_folder_names: IndexMap<String, u64>,
}

/// Conventions found in file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPatterns {
    /// `date_8_digits` / `date_6_digits` occurrence counts.
    pub date_patterns: BTreeMap<String, u64>,
    /// Files containing `underscore` / `dash`.
    pub separator_patterns: BTreeMap<String, u64>,
    pub extension_patterns: BTreeMap<String, u64>,
}

/// Summary report written next to a tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub scan_summary: ScanInfo,
    pub statistics: Statistics,
    pub structure_analysis: StructureAnalysis,
    pub naming_patterns: NamingPatterns,
    pub recommendations: Vec<String>,
}

impl SummaryReport {
    pub fn from_document(document: &TreeDocument) -> Self {
        let structure_analysis = analyze_structure(&document.tree);
        let naming_patterns = analyze_naming(&document.tree);
        let recommendations = recommend(
            &structure_analysis,
            &naming_patterns,
            document.statistics.total_files,
        );

        Self {
            scan_summary: document.scan_info.clone(),
            statistics: document.statistics.clone(),
            structure_analysis,
            naming_patterns,
            recommendations,
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| IndexError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| IndexError::io(path, e))?;
        Ok(())
    }
}

fn analyze_structure(tree: &TreeNode) -> StructureAnalysis {
    let common_folder_names = tree
        .walk()
        .filter(|node| !node.name.is_empty())
        .map(|node| node.name.as_str())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(name, count)| (name.to_string(), count as u64))
        .collect();

    StructureAnalysis {
        root_directories: tree.children.keys().cloned().collect(),
        total_depth: tree.deepest().saturating_sub(tree.depth),
        common_folder_names,
    }
}

fn analyze_naming(tree: &TreeNode) -> NamingPatterns {
    let mut patterns = NamingPatterns::default();

    for file in tree.walk().flat_map(|node| node.files.iter()) {
        for date in DATE_RE.find_iter(&file.name) {
            let key = format!("date_{}_digits", date.as_str().len());
            *patterns.date_patterns.entry(key).or_insert(0) += 1;
        }
        if file.name.contains('_') {
            *patterns
                .separator_patterns
                .entry("underscore".to_string())
                .or_insert(0) += 1;
        }
        if file.name.contains('-') {
            *patterns
                .separator_patterns
                .entry("dash".to_string())
                .or_insert(0) += 1;
        }
        if !file.extension.is_empty() {
            *patterns
                .extension_patterns
                .entry(file.extension.clone())
                .or_insert(0) += 1;
        }
    }
    patterns
}

fn recommend(structure: &StructureAnalysis, naming: &NamingPatterns, total_files: u64) -> Vec<String> {
    let mut out = Vec::new();

    if structure.total_depth > DEEP_TREE_THRESHOLD {
        out.push(format!(
            "Folder structure is very deep ({} levels, more than {DEEP_TREE_THRESHOLD}); browsing may be slow",
            structure.total_depth
        ));
    }

    let separator = |key: &str| naming.separator_patterns.get(key).copied().unwrap_or(0);
    if separator("underscore") > separator("dash") {
        out.push(
            "Underscore (_) is the most common separator, which keeps names portable across systems"
                .to_string(),
        );
    }

    if total_files > LARGE_DISK_THRESHOLD {
        out.push(format!(
            "Large number of files ({total_files}); consider indexing the disk in smaller parts"
        ));
    }
    out
}
