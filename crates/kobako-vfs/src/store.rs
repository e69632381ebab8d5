//! Node store: the arena that owns every node in the tree.
//!
//! Ownership flows root → leaf through each directory's children map.
//! Removing a node frees its whole subtree from the arena, so no id of a
//! removed node can resolve again. Ids are allocated monotonically and
//! never reused within one store.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::node::{Node, NodeData, NodeId};
use crate::permission::Permission;

/// Longest name accepted unless configured otherwise.
pub const DEFAULT_MAX_NAME_LEN: usize = 255;

/// Arena of nodes with a single root directory.
#[derive(Debug, Clone)]
pub struct NodeStore {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_id: u64,
    max_name_len: usize,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new(Permission::default(), DEFAULT_MAX_NAME_LEN)
    }
}

impl NodeStore {
    /// Create a store holding only an empty root.
    pub fn new(root_permission: Permission, max_name_len: usize) -> Self {
        let root = NodeId::new(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::directory("/", root_permission));
        Self {
            nodes,
            root,
            next_id: 1,
            max_name_len,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A store always holds its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Like [`get`](Self::get) but a stale id is a `NotFound`.
    pub fn node(&self, id: NodeId) -> VfsResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| VfsError::not_found(id.to_string()))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> VfsResult<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| VfsError::not_found(id.to_string()))
    }

    /// Look up a direct child by name. `None` if `dir` is not a directory.
    pub fn child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.get(dir)?.children()?.get(name).copied()
    }

    /// Children of a directory in name order.
    pub fn children(&self, dir: NodeId) -> VfsResult<Vec<NodeId>> {
        let node = self.node(dir)?;
        node.children()
            .map(|c| c.values().copied().collect())
            .ok_or_else(|| VfsError::not_a_directory(self.path_of(dir)))
    }

    /// Reject empty names, separators, `.`/`..`, NUL, and overlong names.
    pub fn validate_name(&self, name: &str) -> VfsResult<()> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\0')
            || name.len() > self.max_name_len
        {
            return Err(VfsError::invalid_name(name));
        }
        Ok(())
    }

    /// Absolute path of a node, rebuilt by walking parent links.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(node) = self.get(current) {
            match node.parent {
                Some(parent) => {
                    parts.push(node.name.as_str());
                    current = parent;
                }
                None => break,
            }
        }
        if parts.is_empty() {
            return "/".to_string();
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Path a child named `name` of `parent` would have.
    pub(crate) fn child_path(&self, parent: NodeId, name: &str) -> String {
        let base = self.path_of(parent);
        if base == "/" {
            format!("/{name}")
        } else {
            format!("{base}/{name}")
        }
    }

    /// True if `ancestor` is `node` or lies on its path to the root.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an empty file under `parent`.
    pub fn create_file(
        &mut self,
        parent: NodeId,
        name: &str,
        permission: Permission,
    ) -> VfsResult<NodeId> {
        self.create_file_with_content(parent, name, permission, Vec::new())
    }

    /// Create a file with initial content. Nothing is inserted on failure.
    pub fn create_file_with_content(
        &mut self,
        parent: NodeId,
        name: &str,
        permission: Permission,
        content: Vec<u8>,
    ) -> VfsResult<NodeId> {
        self.check_attach(None, parent, name)?;
        let id = self.alloc(Node::file(name, permission, content));
        self.link_new(id, parent, name)
    }

    /// Create an empty directory under `parent`.
    pub fn create_dir(
        &mut self,
        parent: NodeId,
        name: &str,
        permission: Permission,
    ) -> VfsResult<NodeId> {
        self.check_attach(None, parent, name)?;
        let id = self.alloc(Node::directory(name, permission));
        self.link_new(id, parent, name)
    }

    fn link_new(&mut self, id: NodeId, parent: NodeId, name: &str) -> VfsResult<NodeId> {
        if let Err(e) = self.link(id, parent, name) {
            self.nodes.remove(&id);
            return Err(e);
        }
        Ok(id)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    /// Validate that `node` (or a new node, if `None`) could be attached
    /// to `parent` as `name`. Mutates nothing.
    pub fn check_attach(&self, node: Option<NodeId>, parent: NodeId, name: &str) -> VfsResult<()> {
        self.validate_name(name)?;
        let parent_node = self.node(parent)?;
        let children = parent_node
            .children()
            .ok_or_else(|| VfsError::not_a_directory(self.path_of(parent)))?;
        if children.contains_key(name) {
            return Err(VfsError::already_exists(self.child_path(parent, name)));
        }
        if let Some(node) = node {
            self.node(node)?;
            if self.is_ancestor(node, parent) {
                return Err(VfsError::cycle_detected(
                    self.path_of(node),
                    self.child_path(parent, name),
                ));
            }
        }
        Ok(())
    }

    /// Attach a detached node to `new_parent` under `new_name`.
    pub fn attach(&mut self, node: NodeId, new_parent: NodeId, new_name: &str) -> VfsResult<()> {
        if self.node(node)?.parent.is_some() || node == self.root {
            return Err(VfsError::invalid_path(format!(
                "{} is already attached",
                self.path_of(node)
            )));
        }
        self.check_attach(Some(node), new_parent, new_name)?;
        self.link(node, new_parent, new_name)
    }

    /// Remove `node` from its parent's children map, leaving it in the
    /// arena without a parent. The root cannot be detached.
    pub fn detach(&mut self, node: NodeId) -> VfsResult<()> {
        if node == self.root {
            return Err(VfsError::invalid_path("cannot detach the root directory"));
        }
        let (parent, name) = {
            let n = self.node(node)?;
            match n.parent {
                Some(parent) => (parent, n.name.clone()),
                None => return Ok(()),
            }
        };
        let parent_node = self.node_mut(parent)?;
        if let Some(children) = parent_node.children_mut() {
            children.remove(&name);
        }
        parent_node.touch();
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    /// Move `node` under `new_parent` as `new_name`. All checks run before
    /// anything is touched.
    pub fn reparent(&mut self, node: NodeId, new_parent: NodeId, new_name: &str) -> VfsResult<()> {
        if node == self.root {
            return Err(VfsError::invalid_path("cannot move the root directory"));
        }
        self.check_attach(Some(node), new_parent, new_name)?;
        self.detach(node)?;
        self.link(node, new_parent, new_name)
    }

    fn link(&mut self, node: NodeId, parent: NodeId, name: &str) -> VfsResult<()> {
        self.node(node)?;
        if !self.node(parent)?.is_dir() {
            return Err(VfsError::not_a_directory(self.path_of(parent)));
        }
        let parent_node = self.node_mut(parent)?;
        if let Some(children) = parent_node.children_mut() {
            children.insert(name.to_string(), node);
        }
        parent_node.touch();

        let n = self.node_mut(node)?;
        n.name = name.to_string();
        n.parent = Some(parent);
        Ok(())
    }

    /// Detach `node` and free it along with its whole subtree.
    ///
    /// Returns the number of nodes freed.
    pub fn remove(&mut self, node: NodeId) -> VfsResult<usize> {
        if node == self.root {
            return Err(VfsError::invalid_path("cannot remove the root directory"));
        }
        self.detach(node)?;

        let mut stack = vec![node];
        let mut freed = 0;
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&id) {
                freed += 1;
                if let NodeData::Directory(children) = removed.data {
                    stack.extend(children.into_values());
                }
            }
        }
        debug!(node = %node, freed, "removed subtree");
        Ok(freed)
    }

    /// Deep-copy a subtree into fresh ids. The copy is detached; content
    /// and permissions are duplicated, never shared.
    pub fn duplicate(&mut self, source: NodeId) -> VfsResult<NodeId> {
        let copy = self.node(source)?.clone();
        let copy_id = self.alloc(copy);
        self.node_mut(copy_id)?.parent = None;

        let mut pending = vec![(source, copy_id)];
        while let Some((src, dst)) = pending.pop() {
            let children: Vec<(String, NodeId)> = match self.node(src)?.children() {
                Some(c) => c.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                None => continue,
            };
            let mut copied = std::collections::BTreeMap::new();
            for (name, child) in children {
                let mut node = self.node(child)?.clone();
                node.parent = Some(dst);
                let child_copy = self.alloc(node);
                copied.insert(name, child_copy);
                pending.push((child, child_copy));
            }
            if let Some(c) = self.node_mut(dst)?.children_mut() {
                *c = copied;
            }
        }
        Ok(copy_id)
    }

    /// Number of nodes in the subtree rooted at `node`, itself included.
    pub fn subtree_len(&self, node: NodeId) -> usize {
        let mut stack = vec![node];
        let mut count = 0;
        while let Some(id) = stack.pop() {
            if let Some(n) = self.get(id) {
                count += 1;
                if let Some(children) = n.children() {
                    stack.extend(children.values().copied());
                }
            }
        }
        count
    }
}
