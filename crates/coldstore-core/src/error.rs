//! Error types for scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a scan before or outside the walk.
///
/// Everything that can go wrong for a single directory or file during the
/// walk is a [`ScanWarning`] instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An exclusion pattern failed to compile.
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A tree document breaks its own structural guarantees.
    #[error("Invalid tree document: {message}")]
    InvalidDocument { message: String },

    /// A document or snapshot could not be encoded or decoded.
    #[error("Serialization failed for {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create a pattern error from any displayable compile error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: reason.to_string(),
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Path vanished between listing and processing.
    NotFound,
    /// Error reading a directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// A followed symlink resolved to a directory that was already visited.
    SymlinkLoop,
    /// A name is not valid UTF-8 and is recorded lossily.
    LossyName,
}

/// Non-fatal warning encountered during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    #[serde(with = "crate::paths::lossy")]
    pub path: PathBuf,
    /// Human-readable message, always naming the path.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a permission denied warning.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Permission denied: {}", path.display()),
            path,
            kind: WarningKind::PermissionDenied,
        }
    }

    /// Classify an error raised while listing a directory.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            std::io::ErrorKind::NotFound => Self {
                message: format!("Directory not found: {}", path.display()),
                path,
                kind: WarningKind::NotFound,
            },
            _ => Self {
                message: format!("OS error '{error}': {}", path.display()),
                path,
                kind: WarningKind::ReadError,
            },
        }
    }

    /// Create a metadata error warning for a single entry.
    pub fn metadata_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Could not read metadata '{error}': {}", path.display()),
            path,
            kind: WarningKind::MetadataError,
        }
    }

    /// Create a symlink loop warning.
    pub fn symlink_loop(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let target = target.into();
        Self {
            message: format!(
                "Already visited via another path: {} -> {}",
                path.display(),
                target.display()
            ),
            path,
            kind: WarningKind::SymlinkLoop,
        }
    }

    /// Create a warning for a name that cannot be stored exactly.
    pub fn lossy_name(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Name is not valid UTF-8, recorded as: {}", path.display()),
            path,
            kind: WarningKind::LossyName,
        }
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
