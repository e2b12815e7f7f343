//! Error types for index building.

use std::path::PathBuf;

use coldstore_core::ScanError;
use thiserror::Error;

/// Errors raised while turning tree documents into directory indexes.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A tree document could not be read or is structurally invalid.
    #[error(transparent)]
    Document(#[from] ScanError),

    /// A disk id that cannot key a directory set.
    #[error("Invalid disk id '{disk_id}': {reason}")]
    InvalidDiskId { disk_id: String, reason: String },

    /// Records handed to a store belong to another disk.
    #[error("Record for disk '{found}' passed while replacing disk '{expected}'")]
    DiskMismatch { expected: String, found: String },

    /// I/O error while writing a report.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A report could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
