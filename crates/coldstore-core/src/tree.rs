//! Flat arena holding every directory of a scan.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::{NodeKind, TreeNode};
use crate::error::ScanError;
use crate::node::{DirId, DirNode, FileRecord};

/// All directories of one scan, indexed by [`DirId`].
///
/// Node 0 is always the scan root. Nodes are only ever appended, so ids
/// stay valid for the lifetime of the arena and across checkpoints.
/// Deserialization rejects node lists that break these rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawArena")]
pub struct DirArena {
    nodes: Vec<DirNode>,
}

/// Unchecked wire form of [`DirArena`].
#[derive(Deserialize)]
struct RawArena {
    nodes: Vec<DirNode>,
}

impl TryFrom<RawArena> for DirArena {
    type Error = ScanError;

    fn try_from(raw: RawArena) -> Result<Self, Self::Error> {
        let arena = Self { nodes: raw.nodes };
        arena.check()?;
        Ok(arena)
    }
}

impl DirArena {
    /// Create an arena containing only the root directory.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        let root_path = root_path.into();
        let name = root_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root_path.to_string_lossy().into_owned());

        Self {
            nodes: vec![DirNode::new_root(DirId::new(0), name, root_path)],
        }
    }

    /// Id of the root directory.
    pub fn root_id(&self) -> DirId {
        DirId::new(0)
    }

    /// The root directory.
    pub fn root(&self) -> &DirNode {
        &self.nodes[0]
    }

    /// Absolute path of the scan root.
    pub fn root_path(&self) -> &Path {
        &self.root().path
    }

    /// Look up a directory.
    pub fn get(&self, id: DirId) -> Option<&DirNode> {
        self.nodes.get(id.index())
    }

    /// Number of directories including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is present from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over every directory in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &DirNode> {
        self.nodes.iter()
    }

    /// Child ids of a directory, in discovery order.
    pub fn children(&self, id: DirId) -> Vec<DirId> {
        self.get(id)
            .map(|node| node.children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Attach a child directory, or return the existing one with that name.
    ///
    /// Returns the id and whether a new node was created. Returns `None` if
    /// `parent` is not in this arena.
    pub fn add_child(
        &mut self,
        parent: DirId,
        name: &str,
        path: impl Into<PathBuf>,
    ) -> Option<(DirId, bool)> {
        let parent_node = self.nodes.get(parent.index())?;
        if let Some(existing) = parent_node.children.get(name) {
            return Some((*existing, false));
        }

        let id = DirId::new(self.nodes.len() as u32);
        let child = DirNode::new_child(id, parent_node, name, path.into());
        self.nodes.push(child);

        let parent_node = &mut self.nodes[parent.index()];
        parent_node.children.insert(name.into(), id);
        parent_node.metadata.subdirectory_count = parent_node.children.len() as u64;
        Some((id, true))
    }

    /// Replace a directory's file list and recompute its file counters.
    ///
    /// Re-expanding a directory must never duplicate its files, so this
    /// always overwrites.
    pub fn replace_files(&mut self, id: DirId, files: Vec<FileRecord>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.metadata.file_count = files.len() as u64;
            node.metadata.total_size = files.iter().map(|f| f.size).sum();
            node.files = files;
        }
    }

    /// Number of files across all directories.
    pub fn file_count(&self) -> u64 {
        self.nodes.iter().map(|n| n.files.len() as u64).sum()
    }

    /// Deepest directory in the arena.
    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Check the structural rules every arena obeys.
    ///
    /// Node 0 is a root at depth 0, every node sits at its own index, and
    /// every child link points to an existing node one level deeper whose
    /// parent is the linking node. Depth strictly grows along links, so a
    /// checked arena has no cycles.
    pub fn check(&self) -> Result<(), ScanError> {
        let invalid = |message: String| Err(ScanError::InvalidDocument { message });

        let Some(root) = self.nodes.first() else {
            return invalid("arena has no root".to_string());
        };
        if root.parent.is_some() || root.depth != 0 {
            return invalid("node 0 is not a root".to_string());
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.index() != index {
                return invalid(format!("node at index {index} has id {}", node.id.0));
            }
            if index > 0 && node.parent.is_none() {
                return invalid(format!("node {index} has no parent"));
            }
            for child_id in node.children.values() {
                let Some(child) = self.get(*child_id) else {
                    return invalid(format!("node {index} links missing child {}", child_id.0));
                };
                if child.parent != Some(node.id) || child.depth != node.depth + 1 {
                    return invalid(format!(
                        "node {index} links child {} at the wrong position",
                        child_id.0
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the nested representation used by the tree document.
    pub fn to_tree_node(&self) -> TreeNode {
        self.build_node(self.root())
    }

    fn build_node(&self, node: &DirNode) -> TreeNode {
        let mut children = IndexMap::with_capacity(node.children.len());
        for (name, child_id) in &node.children {
            if let Some(child) = self.get(*child_id) {
                children.insert(name.to_string(), self.build_node(child));
            }
        }

        TreeNode {
            kind: NodeKind::Directory,
            name: node.name.to_string(),
            path: node.path.clone(),
            relative_path: node.relative_path.clone(),
            parent_path: node.parent_path.clone(),
            depth: node.depth,
            children,
            files: node.files.clone(),
            metadata: node.metadata,
        }
    }
}
