//! Directory index storage with replace-per-disk semantics.

use std::collections::BTreeMap;

use coldstore_core::TreeDocument;

use crate::disk_id::disk_id_from_name;
use crate::error::IndexError;
use crate::flatten::{FlatFile, flatten};
use crate::materialize::{DirectoryRecord, materialize};

/// Storage for materialized directory tables, keyed by disk.
///
/// A disk's records are only ever replaced as a whole, so counts from an
/// earlier scan can never survive next to a newer one.
pub trait DirectoryStore {
    /// Drop every record of `disk_id` and insert `records` instead.
    /// Returns the number of records stored.
    fn replace_disk(
        &mut self,
        disk_id: &str,
        records: Vec<DirectoryRecord>,
    ) -> Result<usize, IndexError>;

    /// Drop every record of `disk_id`. Returns how many were removed.
    fn remove_disk(&mut self, disk_id: &str) -> usize;

    /// Whether any directory set is stored under `disk_id`.
    fn contains_disk(&self, disk_id: &str) -> bool;

    /// All records of a disk, ordered by depth then path.
    fn directories(&self, disk_id: &str) -> Vec<DirectoryRecord>;

    /// A single directory by its path.
    fn get(&self, disk_id: &str, path: &str) -> Option<DirectoryRecord>;

    /// Direct subdirectories of `parent`, or the top level when `None`,
    /// ordered by name.
    fn children(&self, disk_id: &str, parent: Option<&str>) -> Vec<DirectoryRecord>;

    /// `base` if unused, otherwise the first free `base_1`, `base_2`, ...
    fn unique_disk_id(&self, base: &str) -> String {
        if !self.contains_disk(base) {
            return base.to_string();
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.contains_disk(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Materialize `files` and replace the stored records of `disk_id`.
pub fn rematerialize<S: DirectoryStore + ?Sized>(
    store: &mut S,
    disk_id: &str,
    files: &[FlatFile],
) -> Result<usize, IndexError> {
    let records = materialize(disk_id, files);
    let count = store.replace_disk(disk_id, records)?;
    tracing::info!(disk_id, files = files.len(), directories = count, "materialized directories");
    Ok(count)
}

/// Register a tree document as a new disk named after `name`.
///
/// The disk id is derived from `name` and made unique within `store`.
/// Returns the id used.
pub fn ingest_document<S: DirectoryStore + ?Sized>(
    store: &mut S,
    name: &str,
    document: &TreeDocument,
) -> Result<String, IndexError> {
    document.validate()?;
    let disk_id = store.unique_disk_id(&disk_id_from_name(name));
    rematerialize(store, &disk_id, &flatten(&document.tree))?;
    Ok(disk_id)
}

/// Directory store kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectoryStore {
    disks: BTreeMap<String, BTreeMap<String, DirectoryRecord>>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored disk, sorted.
    pub fn disk_ids(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }

    /// Number of stored directories across all disks.
    pub fn len(&self) -> usize {
        self.disks.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DirectoryStore for InMemoryDirectoryStore {
    fn replace_disk(
        &mut self,
        disk_id: &str,
        records: Vec<DirectoryRecord>,
    ) -> Result<usize, IndexError> {
        if disk_id.is_empty() {
            return Err(IndexError::InvalidDiskId {
                disk_id: disk_id.to_string(),
                reason: "disk id cannot be empty".to_string(),
            });
        }
        if let Some(foreign) = records.iter().find(|r| r.disk_id != disk_id) {
            return Err(IndexError::DiskMismatch {
                expected: disk_id.to_string(),
                found: foreign.disk_id.clone(),
            });
        }

        let table: BTreeMap<String, DirectoryRecord> = records
            .into_iter()
            .map(|record| (record.directory_path.clone(), record))
            .collect();
        let count = table.len();
        self.disks.insert(disk_id.to_string(), table);
        Ok(count)
    }

    fn remove_disk(&mut self, disk_id: &str) -> usize {
        self.disks.remove(disk_id).map_or(0, |table| table.len())
    }

    fn contains_disk(&self, disk_id: &str) -> bool {
        self.disks.contains_key(disk_id)
    }

    fn directories(&self, disk_id: &str) -> Vec<DirectoryRecord> {
        let Some(table) = self.disks.get(disk_id) else {
            return Vec::new();
        };
        let mut records: Vec<DirectoryRecord> = table.values().cloned().collect();
        records.sort_by(|a, b| {
            a.depth_level
                .cmp(&b.depth_level)
                .then_with(|| a.directory_path.cmp(&b.directory_path))
        });
        records
    }

    fn get(&self, disk_id: &str, path: &str) -> Option<DirectoryRecord> {
        self.disks.get(disk_id)?.get(path).cloned()
    }

    fn children(&self, disk_id: &str, parent: Option<&str>) -> Vec<DirectoryRecord> {
        let Some(table) = self.disks.get(disk_id) else {
            return Vec::new();
        };
        let mut children: Vec<DirectoryRecord> = table
            .values()
            .filter(|record| record.parent_path.as_deref() == parent)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.directory_name.cmp(&b.directory_name));
        children
    }
}
