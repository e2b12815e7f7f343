//! Directory indexes and reports built from coldstore tree documents.
//!
//! A finished scan is a nested [`TreeDocument`]. Browsing a disk by folder
//! needs the same information as a flat table instead: this crate flattens
//! the tree into files, materializes one [`DirectoryRecord`] per folder and
//! keeps those records per disk in a [`DirectoryStore`].
//!
//! # Example
//!
//! ```rust,no_run
//! use coldstore_core::TreeDocument;
//! use coldstore_index::{DirectoryStore, InMemoryDirectoryStore, ingest_document};
//! use std::path::Path;
//!
//! let doc = TreeDocument::load(Path::new("Archive01.json")).unwrap();
//! let mut store = InMemoryDirectoryStore::new();
//! let disk_id = ingest_document(&mut store, "Archive01.json", &doc).unwrap();
//!
//! for dir in store.children(&disk_id, None) {
//!     println!("{} ({} files)", dir.directory_name, dir.file_count);
//! }
//! ```

mod disk_id;
mod error;
mod flatten;
mod materialize;
mod store;
mod summary;

pub use disk_id::disk_id_from_name;
pub use error::IndexError;
pub use flatten::{FlatFile, flatten};
pub use materialize::{DirectoryRecord, materialize};
pub use store::{DirectoryStore, InMemoryDirectoryStore, ingest_document, rematerialize};
pub use summary::{
    DEEP_TREE_THRESHOLD, LARGE_DISK_THRESHOLD, NamingPatterns, StructureAnalysis, SummaryReport,
};

pub use coldstore_core::TreeDocument;
