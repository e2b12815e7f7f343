//! Core types for coldstore.
//!
//! This crate holds the data structures shared by the scanner and the
//! index builders: scan configuration, the directory arena, statistics,
//! file categories and the serialized tree document.

mod category;
mod config;
pub mod defaults;
mod document;
mod error;
mod node;
pub mod paths;
mod stats;
mod tree;

pub use category::FileCategory;
pub use config::{ScanConfig, ScanConfigBuilder, normalize_extension, safe_disk_name};
pub use document::{NodeKind, ScanInfo, TreeDocument, TreeNode, temp_path_for};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use node::{DirId, DirMetadata, DirNode, FileRecord, Timestamps, extension_of, join_relative};
pub use stats::{LargestFile, Statistics};
pub use tree::DirArena;
