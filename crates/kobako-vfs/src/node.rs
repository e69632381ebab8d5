//! Node types.
//!
//! Nodes live in the [`NodeStore`](crate::store::NodeStore) arena and are
//! addressed by [`NodeId`]. A directory owns its children through its
//! name → id map; the `parent` id on every node is a back-link used for
//! `..` and `pwd` and never keeps anything alive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::permission::Permission;

/// Arena handle for a node.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw arena index.
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl NodeKind {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Children by name. Sorted, so listings are deterministic.
    Directory(BTreeMap<String, NodeId>),
    /// Raw file bytes.
    File(Vec<u8>),
}

/// A file or directory in the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) permission: Permission,
    pub(crate) parent: Option<NodeId>,
    pub(crate) data: NodeData,
    pub(crate) created: SystemTime,
    pub(crate) modified: SystemTime,
}

impl Node {
    pub(crate) fn directory(name: impl Into<String>, permission: Permission) -> Self {
        Self::with_data(name, permission, NodeData::Directory(BTreeMap::new()))
    }

    pub(crate) fn file(name: impl Into<String>, permission: Permission, content: Vec<u8>) -> Self {
        Self::with_data(name, permission, NodeData::File(content))
    }

    fn with_data(name: impl Into<String>, permission: Permission, data: NodeData) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            permission,
            parent: None,
            data,
            created: now,
            modified: now,
        }
    }

    /// Entry name (the root is named `/`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Directory(_) => NodeKind::Directory,
            NodeData::File(_) => NodeKind::File,
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Parent back-link; `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_dir(&self) -> bool {
        self.kind().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.kind().is_file()
    }

    /// Content length for files, 0 for directories.
    pub fn size(&self) -> u64 {
        match &self.data {
            NodeData::File(bytes) => bytes.len() as u64,
            NodeData::Directory(_) => 0,
        }
    }

    pub(crate) fn children(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.data {
            NodeData::Directory(children) => Some(children),
            NodeData::File(_) => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.data {
            NodeData::Directory(children) => Some(children),
            NodeData::File(_) => None,
        }
    }

    pub(crate) fn content(&self) -> Option<&Vec<u8>> {
        match &self.data {
            NodeData::File(bytes) => Some(bytes),
            NodeData::Directory(_) => None,
        }
    }

    pub(crate) fn content_mut(&mut self) -> Option<&mut Vec<u8>> {
        match &mut self.data {
            NodeData::File(bytes) => Some(bytes),
            NodeData::Directory(_) => None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.modified = SystemTime::now();
    }

    /// Attributes snapshot.
    pub fn attr(&self) -> FileAttr {
        FileAttr {
            kind: self.kind(),
            size: self.size(),
            permission: self.permission,
            children: self.children().map_or(0, BTreeMap::len),
            created: self.created,
            modified: self.modified,
        }
    }
}

/// Node attributes (metadata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttr {
    /// File type.
    pub kind: NodeKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Access mode.
    pub permission: Permission,
    /// Number of direct children (0 for files).
    pub children: usize,
    /// Creation time.
    pub created: SystemTime,
    /// Last modification time.
    pub modified: SystemTime,
}

impl FileAttr {
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: NodeKind,
    /// Access mode.
    pub permission: Permission,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl DirEntry {
    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            kind: node.kind(),
            permission: node.permission,
            size: node.size(),
        }
    }
}
