//! Serializable images of a filesystem.
//!
//! A [`Snapshot`] holds the tree (names, kinds, permissions, content) and
//! the cursor path. Timestamps and node ids are not kept; restoring
//! allocates fresh ones.
//!
//! The tree is stored flat: every node except the root is one
//! [`SnapshotEntry`] in pre-order, pointing at its parent by index. The
//! serialized depth stays constant however deep the tree is.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{VfsError, VfsResult};
use crate::filesystem::FileSystem;
use crate::node::{NodeData, NodeId};
use crate::path;
use crate::permission::Permission;
use crate::store::NodeStore;

/// Image of a whole filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Absolute path of the cursor.
    pub cwd: String,
    /// Permission of the root directory.
    pub root_permission: Permission,
    /// Every other node, parents before children.
    pub entries: Vec<SnapshotEntry>,
}

/// One non-root node of a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Index of the parent in `entries`; `None` for children of the root.
    pub parent: Option<usize>,
    pub name: String,
    pub permission: Permission,
    #[serde(flatten)]
    pub body: SnapshotBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotBody {
    Directory,
    File { content: Vec<u8> },
}

impl Snapshot {
    pub fn to_json(&self) -> VfsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> VfsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the image to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> VfsResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read an image from a file.
    pub fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

impl FileSystem {
    /// Capture the current tree and cursor.
    pub fn snapshot(&self) -> Snapshot {
        let root = self.store.root();
        let root_permission = self
            .store
            .get(root)
            .map(|n| n.permission())
            .unwrap_or_default();
        Snapshot {
            cwd: self.pwd(),
            root_permission,
            entries: capture(&self.store, root),
        }
    }

    /// Replace the tree and cursor with those of `snapshot`.
    ///
    /// The image is rebuilt into a fresh store first, so a bad image (an
    /// invalid or duplicate name, a parent index that does not point back
    /// at an earlier directory, a cursor that is not a directory) leaves
    /// the live tree as it was.
    pub fn restore(&mut self, snapshot: &Snapshot) -> VfsResult<()> {
        let mut store = NodeStore::new(snapshot.root_permission, self.config.max_name_len);
        let root = store.root();

        // Node id of each entry, in entry order.
        let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.entries.len());
        for (index, entry) in snapshot.entries.iter().enumerate() {
            let parent = match entry.parent {
                None => root,
                Some(p) if p < index => ids[p],
                Some(p) => {
                    return Err(VfsError::invalid_path(format!(
                        "snapshot entry {index} ({}) has parent {p}, which does not precede it",
                        entry.name
                    )));
                }
            };
            let id = match &entry.body {
                SnapshotBody::Directory => {
                    store.create_dir(parent, &entry.name, entry.permission)?
                }
                SnapshotBody::File { content } => store.create_file_with_content(
                    parent,
                    &entry.name,
                    entry.permission,
                    content.clone(),
                )?,
            };
            ids.push(id);
        }

        let cursor = path::resolve(&store, &snapshot.cwd, root)?;
        if !store.node(cursor)?.is_dir() {
            return Err(VfsError::not_a_directory(snapshot.cwd.clone()));
        }

        self.store = store;
        self.cursor = cursor;
        info!(nodes = self.store.len(), cwd = %snapshot.cwd, "restored snapshot");
        Ok(())
    }
}

/// Pre-order walk below `root`, children in name order.
fn capture(store: &NodeStore, root: NodeId) -> Vec<SnapshotEntry> {
    let mut entries = Vec::with_capacity(store.len().saturating_sub(1));
    let mut stack: Vec<(NodeId, Option<usize>)> = Vec::new();
    push_children(store, root, None, &mut stack);

    while let Some((id, parent)) = stack.pop() {
        let Some(node) = store.get(id) else {
            continue;
        };
        let body = match &node.data {
            NodeData::File(content) => SnapshotBody::File {
                content: content.clone(),
            },
            NodeData::Directory(_) => SnapshotBody::Directory,
        };
        let index = entries.len();
        entries.push(SnapshotEntry {
            parent,
            name: node.name().to_string(),
            permission: node.permission(),
            body,
        });
        push_children(store, id, Some(index), &mut stack);
    }
    entries
}

/// Queue a directory's children so they pop in name order.
fn push_children(
    store: &NodeStore,
    dir: NodeId,
    parent: Option<usize>,
    stack: &mut Vec<(NodeId, Option<usize>)>,
) {
    if let Ok(children) = store.children(dir) {
        stack.extend(children.into_iter().rev().map(|child| (child, parent)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileSystem {
        let mut fs = FileSystem::new();
        fs.create_dir("bin").unwrap();
        fs.create_file_with_content("bin/run", "40 + 2").unwrap();
        fs.chmod("bin/run", "7").unwrap();
        fs.create_dir("home").unwrap();
        fs.create_file_with_content("home/notes", vec![0u8, 1, 2, 255]).unwrap();
        fs.cd("home").unwrap();
        fs
    }

    /// A single chain of directories `depth` levels deep, cursor at the bottom.
    fn chain(depth: usize) -> FileSystem {
        let mut fs = FileSystem::new();
        for _ in 0..depth {
            fs.create_dir("d").unwrap();
            fs.cd("d").unwrap();
        }
        fs
    }

    #[test]
    fn test_snapshot_restore() {
        let fs = sample();
        let snap = fs.snapshot();
        assert_eq!(snap.cwd, "/home");

        let mut other = FileSystem::new();
        other.create_file("junk").unwrap();
        other.restore(&snap).unwrap();

        assert_eq!(other.pwd(), "/home");
        assert!(!other.exists("/junk"));
        assert_eq!(other.read_file("/bin/run").unwrap(), b"40 + 2");
        assert_eq!(other.stat("/bin/run").unwrap().permission, Permission::ALL);
        assert_eq!(other.read_file("notes").unwrap(), vec![0u8, 1, 2, 255]);
        assert_eq!(other.node_count(), fs.node_count());
        assert_eq!(other.snapshot(), snap);
    }

    #[test]
    fn test_entries_are_pre_order() {
        let snap = sample().snapshot();
        let names: Vec<(&str, Option<usize>)> = snap
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.parent))
            .collect();
        assert_eq!(
            names,
            vec![
                ("bin", None),
                ("run", Some(0)),
                ("home", None),
                ("notes", Some(2)),
            ]
        );
    }

    #[test]
    fn test_json_shape() {
        let snap = sample().snapshot();
        let json = snap.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["root_permission"], 6);
        assert_eq!(value["entries"][0]["kind"], "directory");
        assert_eq!(value["entries"][0]["name"], "bin");
        assert_eq!(value["entries"][1]["kind"], "file");
        assert_eq!(value["entries"][1]["parent"], 0);
        assert_eq!(value["entries"][1]["permission"], 7);
        assert_eq!(Snapshot::from_json(&json).unwrap(), snap);
    }

    #[test]
    fn test_deep_tree_json_round_trip() {
        let fs = chain(200);
        let json = fs.snapshot().to_json().unwrap();
        let snap = Snapshot::from_json(&json).unwrap();
        assert_eq!(snap.entries.len(), 200);

        let mut restored = FileSystem::new();
        restored.restore(&snap).unwrap();
        assert_eq!(restored.pwd(), fs.pwd());
        assert_eq!(restored.node_count(), 201);
    }

    #[test]
    fn test_very_deep_tree_on_small_stack() {
        let fs = chain(5_000);
        let handle = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || {
                let snap = fs.snapshot();
                let mut restored = FileSystem::new();
                restored.restore(&snap).unwrap();
                (snap.entries.len(), restored.node_count())
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), (5_000, 5_001));
    }

    #[test]
    fn test_bad_snapshot_leaves_tree_untouched() {
        let mut fs = sample();
        let before = fs.snapshot();

        let mut dup = before.clone();
        dup.entries.push(dup.entries[0].clone());
        assert!(matches!(fs.restore(&dup), Err(VfsError::AlreadyExists(_))));

        let mut bad_name = before.clone();
        bad_name.entries[0].name = "a/b".into();
        assert!(matches!(fs.restore(&bad_name), Err(VfsError::InvalidName(_))));

        let mut forward = before.clone();
        forward.entries[1].parent = Some(3);
        assert!(matches!(fs.restore(&forward), Err(VfsError::InvalidPath(_))));

        let mut under_file = before.clone();
        under_file.entries[3].parent = Some(1);
        assert!(matches!(fs.restore(&under_file), Err(VfsError::WrongKind { .. })));

        let mut bad_cwd = before.clone();
        bad_cwd.cwd = "/bin/run".into();
        assert!(matches!(fs.restore(&bad_cwd), Err(VfsError::WrongKind { .. })));

        assert_eq!(fs.snapshot(), before);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("image.json");
        let snap = sample().snapshot();
        snap.save(&file).unwrap();
        assert_eq!(Snapshot::load(&file).unwrap(), snap);

        let missing = dir.path().join("missing.json");
        assert!(matches!(Snapshot::load(&missing), Err(VfsError::Io(_))));
        std::fs::write(&file, "{ not json").unwrap();
        assert!(matches!(Snapshot::load(&file), Err(VfsError::Snapshot(_))));
    }
}
