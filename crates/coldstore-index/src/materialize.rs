//! Per-directory summary table derived from a flat file list.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::flatten::FlatFile;

/// One directory of a disk with its direct contents counted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub disk_id: String,
    /// Path relative to the disk root, e.g. `Jobs/2021`.
    pub directory_path: String,
    /// Last path segment.
    pub directory_name: String,
    /// None for top-level directories.
    pub parent_path: Option<String>,
    /// Number of `/` in `directory_path`.
    pub depth_level: u32,
    /// Files whose directory is exactly this one.
    pub file_count: u64,
    /// Distinct immediate child directories.
    pub subdirectory_count: u64,
}

/// Derive the directory table of `disk_id` from its files.
///
/// Every ancestor of every file's directory gets exactly one record; the
/// disk root itself has none. Output is ordered by depth, then path, so the
/// same input always yields the same list.
pub fn materialize(disk_id: &str, files: &[FlatFile]) -> Vec<DirectoryRecord> {
    let file_counts = files
        .iter()
        .map(|file| file.file_path.trim_matches('/'))
        .filter(|path| !path.is_empty())
        .counts();

    // path -> (name, parent, depth)
    let mut candidates: BTreeMap<String, (String, Option<String>, u32)> = BTreeMap::new();
    for dir in file_counts.keys() {
        let mut prefix = String::new();
        for (depth, segment) in dir.split('/').enumerate() {
            let parent = (!prefix.is_empty()).then(|| prefix.clone());
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            candidates
                .entry(prefix.clone())
                .or_insert_with(|| (segment.to_string(), parent, depth as u32));
        }
    }

    let subdir_counts = candidates
        .values()
        .filter_map(|(_, parent, _)| parent.as_deref())
        .counts();

    candidates
        .iter()
        .map(|(path, (name, parent, depth))| DirectoryRecord {
            disk_id: disk_id.to_string(),
            directory_path: path.clone(),
            directory_name: name.clone(),
            parent_path: parent.clone(),
            depth_level: *depth,
            file_count: file_counts.get(path.as_str()).copied().unwrap_or(0) as u64,
            subdirectory_count: subdir_counts.get(path.as_str()).copied().unwrap_or(0) as u64,
        })
        .sorted_by(|a, b| {
            a.depth_level
                .cmp(&b.depth_level)
                .then_with(|| a.directory_path.cmp(&b.directory_path))
        })
        .collect()
}
