//! Running scan statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::FileCategory;
use crate::error::ScanWarning;
use crate::node::FileRecord;

/// The largest file seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    /// Absolute path of the file ("" until a non-empty file is seen).
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Counters accumulated over one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Total number of files recorded.
    pub total_files: u64,
    /// Total number of directories below the root.
    pub total_directories: u64,
    /// Total size of recorded files in bytes.
    pub total_size: u64,
    /// Extension to file count.
    pub file_extensions: BTreeMap<String, u64>,
    /// Category to file count.
    pub file_types: BTreeMap<FileCategory, u64>,
    /// Deepest directory processed.
    pub max_depth: u32,
    /// Largest file seen.
    pub largest_file: LargestFile,
    /// Wall-clock time from the original start, across resumes.
    pub scan_duration_seconds: f64,
    /// Processed directories per depth, root included.
    pub directory_depth_distribution: BTreeMap<u32, u64>,
    /// Recoverable problems, one readable line each.
    pub errors_warnings: Vec<String>,
}

impl Statistics {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update stats with a file entry.
    pub fn record_file(&mut self, file: &FileRecord) {
        self.total_files += 1;
        self.total_size += file.size;
        *self
            .file_extensions
            .entry(file.extension.clone())
            .or_insert(0) += 1;
        *self.file_types.entry(file.category).or_insert(0) += 1;

        // Ties keep the earlier file.
        if file.size > self.largest_file.size {
            self.largest_file = LargestFile {
                name: file.path.to_string_lossy().into_owned(),
                size: file.size,
            };
        }
    }

    /// Record a newly discovered directory below the root.
    pub fn record_dir(&mut self) {
        self.total_directories += 1;
    }

    /// Record that a directory at `depth` was processed.
    pub fn record_processed(&mut self, depth: u32) {
        self.max_depth = self.max_depth.max(depth);
        *self.directory_depth_distribution.entry(depth).or_insert(0) += 1;
    }

    /// Record a recoverable problem.
    pub fn record_warning(&mut self, warning: &ScanWarning) {
        self.errors_warnings.push(warning.to_string());
    }

    /// Set the final duration.
    pub fn finish(&mut self, elapsed: Duration) {
        self.scan_duration_seconds = elapsed.as_secs_f64();
    }

    /// Check if there were any warnings during scanning.
    pub fn has_warnings(&self) -> bool {
        !self.errors_warnings.is_empty()
    }

    /// Extensions by descending count, ties by name.
    pub fn top_extensions(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut sorted: Vec<(&str, u64)> = self
            .file_extensions
            .iter()
            .map(|(ext, count)| (ext.as_str(), *count))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(limit);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Timestamps;
    use chrono::{DateTime, Utc};

    fn file(name: &str, size: u64) -> FileRecord {
        FileRecord::new(
            name,
            format!("/disk/{name}"),
            "",
            size,
            Timestamps::with_modified(DateTime::<Utc>::UNIX_EPOCH),
        )
    }

    #[test]
    fn test_stats_default() {
        let stats = Statistics::default();
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.total_files, 0);
        assert_eq!(stats.total_directories, 0);
        assert_eq!(stats.largest_file.name, "");
    }

    #[test]
    fn test_record_file() {
        let mut stats = Statistics::new();
        stats.record_file(&file("a.jpg", 1024));
        stats.record_file(&file("b.JPG", 10));

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size, 1034);
        assert_eq!(stats.file_extensions[".jpg"], 2);
        assert_eq!(stats.file_types[&FileCategory::Image], 2);
        assert_eq!(stats.largest_file.name, "/disk/a.jpg");
    }

    #[test]
    fn test_largest_file_ties_keep_first() {
        let mut stats = Statistics::new();
        stats.record_file(&file("first.mov", 500));
        stats.record_file(&file("second.mov", 500));
        assert_eq!(stats.largest_file.name, "/disk/first.mov");

        stats.record_file(&file("third.mov", 501));
        assert_eq!(stats.largest_file.name, "/disk/third.mov");
    }

    #[test]
    fn test_record_processed_depths() {
        let mut stats = Statistics::new();
        stats.record_processed(0);
        stats.record_processed(1);
        stats.record_processed(1);
        assert_eq!(stats.max_depth, 1);
        assert_eq!(stats.directory_depth_distribution[&1], 2);
    }

    #[test]
    fn test_top_extensions() {
        let mut stats = Statistics::new();
        for name in ["a.jpg", "b.jpg", "c.mov", "d.cr3", "e.cr3"] {
            stats.record_file(&file(name, 1));
        }
        assert_eq!(stats.top_extensions(2), vec![(".cr3", 2), (".jpg", 2)]);
    }

    #[test]
    fn test_json_keys() {
        let mut stats = Statistics::new();
        stats.record_file(&file("clip.mp4", 7));
        stats.record_processed(0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["file_types"]["video"], 1);
        assert_eq!(json["directory_depth_distribution"]["0"], 1);

        let back: Statistics = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }
}
