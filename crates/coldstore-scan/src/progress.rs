//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information published after every processed directory.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    /// Directories processed so far, including resumed ones.
    pub dirs_processed: u64,
    /// Directory count from the counting pass, if it ran.
    pub dirs_estimated: Option<u64>,
    /// Files recorded so far.
    pub files_found: u64,
    /// Total bytes of recorded files.
    pub bytes_found: u64,
    /// Directory just processed.
    pub current_path: PathBuf,
    /// Depth of `current_path`.
    pub depth: u32,
    /// Number of errors/warnings encountered.
    pub errors_count: u64,
    /// Time since the scan originally started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Fraction of the estimated directories processed, clamped to 1.0.
    pub fn fraction(&self) -> Option<f64> {
        match self.dirs_estimated {
            Some(0) | None => None,
            Some(total) => Some((self.dirs_processed as f64 / total as f64).min(1.0)),
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_found as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let mut progress = ScanProgress {
            dirs_processed: 5,
            dirs_estimated: Some(20),
            ..Default::default()
        };
        assert_eq!(progress.fraction(), Some(0.25));

        // Estimates can fall short when the tree grows during the scan.
        progress.dirs_processed = 30;
        assert_eq!(progress.fraction(), Some(1.0));

        progress.dirs_estimated = None;
        assert_eq!(progress.fraction(), None);
    }

    #[test]
    fn test_rate_without_elapsed() {
        let progress = ScanProgress {
            files_found: 10,
            ..Default::default()
        };
        assert_eq!(progress.files_per_second(), 0.0);
    }
}
