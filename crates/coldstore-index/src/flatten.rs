//! Flat file listing of a tree document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coldstore_core::{FileCategory, TreeNode, extension_of, join_relative};

/// One file of a disk, addressed by its directory path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFile {
    pub filename: String,
    /// Directory path relative to the disk root, "" for the root.
    pub file_path: String,
    /// `file_path` joined with `filename`.
    pub full_path: String,
    pub size: u64,
    pub extension: String,
    pub category: FileCategory,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FlatFile {
    /// Build a file from a `/`-separated path relative to the disk root.
    pub fn from_path(full_path: &str, size: u64) -> Self {
        let full_path = full_path.trim_matches('/');
        let (file_path, filename) = match full_path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", full_path),
        };
        let extension = extension_of(filename);
        Self {
            filename: filename.to_string(),
            file_path: file_path.to_string(),
            full_path: full_path.to_string(),
            size,
            category: FileCategory::from_extension(&extension),
            extension,
            created: DateTime::<Utc>::UNIX_EPOCH,
            modified: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// List every file below `tree`, parents before children.
///
/// Directory paths are rebuilt from child-map keys, so the result does not
/// depend on the paths recorded inside the nodes.
pub fn flatten(tree: &TreeNode) -> Vec<FlatFile> {
    let mut out = Vec::new();
    let mut stack: Vec<(&TreeNode, String)> = vec![(tree, String::new())];

    while let Some((node, dir_path)) = stack.pop() {
        for file in &node.files {
            out.push(FlatFile {
                filename: file.name.to_string(),
                full_path: join_relative(&dir_path, &file.name),
                file_path: dir_path.clone(),
                size: file.size,
                extension: file.extension.clone(),
                category: file.category,
                created: file.created,
                modified: file.modified,
            });
        }
        for (name, child) in node.children.iter().rev() {
            stack.push((child, join_relative(&dir_path, name)));
        }
    }
    out
}
