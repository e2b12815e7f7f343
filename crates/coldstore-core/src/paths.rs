//! Serde helpers for paths that may not be valid UTF-8.
//!
//! JSON strings must be UTF-8, so archive disks written by old systems
//! can hold names serde_json refuses to encode. These helpers write such
//! paths lossily (invalid bytes become U+FFFD) instead of failing the
//! whole document.

use std::path::Path;

/// Whether `path` survives a JSON round trip unchanged.
pub fn is_lossless(path: &Path) -> bool {
    path.to_str().is_some()
}

/// `#[serde(with = "...")]` adapter for a single `PathBuf`.
pub mod lossy {
    use std::path::{Path, PathBuf};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&path.to_string_lossy())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PathBuf, D::Error> {
        String::deserialize(deserializer).map(PathBuf::from)
    }
}

/// `#[serde(with = "...")]` adapter for a `BTreeSet<PathBuf>`.
pub mod lossy_set {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        paths: &BTreeSet<PathBuf>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(paths.iter().map(|p| p.to_string_lossy()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<PathBuf>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(PathBuf::from).collect())
    }
}
