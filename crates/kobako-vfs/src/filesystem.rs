//! The filesystem façade: the public operation surface.
//!
//! A [`FileSystem`] owns one [`NodeStore`] plus the cursor (current
//! directory). Every operation validates its own input, and either
//! completes or leaves the tree untouched.
//!
//! Content operations and the tree dump are further `impl FileSystem`
//! blocks in their own modules; gated execution lives in [`exec`](crate::exec).

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::exec::ExecutionEngine;
use crate::node::{DirEntry, FileAttr, Node, NodeId, NodeKind};
use crate::path;
use crate::permission::Permission;
use crate::store::NodeStore;

/// An in-memory filesystem with a current-directory cursor.
pub struct FileSystem {
    pub(crate) store: NodeStore,
    pub(crate) cursor: NodeId,
    pub(crate) config: VfsConfig,
    pub(crate) engine: Option<Arc<dyn ExecutionEngine>>,
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("nodes", &self.store.len())
            .field("cwd", &self.pwd())
            .field("config", &self.config)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    /// Create an empty, formatted filesystem with default configuration.
    pub fn new() -> Self {
        Self::with_config(VfsConfig::default())
    }

    /// Create an empty, formatted filesystem.
    pub fn with_config(config: VfsConfig) -> Self {
        let store = NodeStore::new(config.default_permission, config.max_name_len);
        let cursor = store.root();
        Self {
            store,
            cursor,
            config,
            engine: None,
        }
    }

    /// Attach the execution collaborator used by [`exec`](Self::exec).
    pub fn with_engine(mut self, engine: Arc<dyn ExecutionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replace (or clear) the execution collaborator.
    pub fn set_engine(&mut self, engine: Option<Arc<dyn ExecutionEngine>>) {
        self.engine = engine;
    }

    pub fn engine(&self) -> Option<&Arc<dyn ExecutionEngine>> {
        self.engine.as_ref()
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    /// Read-only view of the node arena.
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Node the cursor points at.
    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Total live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    // ========================================================================
    // Resolution helpers
    // ========================================================================

    /// Resolve a path against the cursor.
    pub fn resolve(&self, path: &str) -> VfsResult<NodeId> {
        path::resolve(&self.store, path, self.cursor)
    }

    /// Resolve a path that must name a file.
    pub(crate) fn resolve_file(&self, path: &str) -> VfsResult<NodeId> {
        let id = self.resolve(path)?;
        self.expect_kind(id, NodeKind::File)?;
        Ok(id)
    }

    /// Resolve a path that must name a directory.
    pub(crate) fn resolve_dir(&self, path: &str) -> VfsResult<NodeId> {
        let id = self.resolve(path)?;
        self.expect_kind(id, NodeKind::Directory)?;
        Ok(id)
    }

    pub(crate) fn expect_kind(&self, id: NodeId, expected: NodeKind) -> VfsResult<&Node> {
        let node = self.store.node(id)?;
        if node.kind() == expected {
            return Ok(node);
        }
        let path = self.store.path_of(id);
        Err(match expected {
            NodeKind::File => VfsError::is_a_directory(path),
            NodeKind::Directory => VfsError::not_a_directory(path),
        })
    }

    /// Where a move/copy of `src` to `dst` lands: inside `dst` when it is an
    /// existing directory, otherwise at `dst` itself.
    pub(crate) fn destination(&self, src: NodeId, dst: &str) -> VfsResult<(NodeId, String)> {
        match self.resolve(dst) {
            Ok(existing) => {
                let node = self.store.node(existing)?;
                if node.is_dir() {
                    let name = self.store.node(src)?.name().to_string();
                    Ok((existing, name))
                } else {
                    Err(VfsError::already_exists(self.store.path_of(existing)))
                }
            }
            Err(VfsError::NotFound(_)) => {
                let (parent, name) = path::resolve_parent(&self.store, dst, self.cursor)?;
                Ok((parent, name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Tree operations
    // ========================================================================

    /// Reset to a single empty root and move the cursor there.
    pub fn format(&mut self) {
        let dropped = self.store.len() - 1;
        self.store = NodeStore::new(self.config.default_permission, self.config.max_name_len);
        self.cursor = self.store.root();
        info!(dropped, "formatted filesystem");
    }

    /// Create an empty file.
    pub fn create_file(&mut self, path: &str) -> VfsResult<NodeId> {
        let (parent, name) = path::resolve_parent(&self.store, path, self.cursor)?;
        let id = self
            .store
            .create_file(parent, name, self.config.default_permission)?;
        debug!(path = %self.store.path_of(id), "created file");
        Ok(id)
    }

    /// Create an empty directory.
    pub fn create_dir(&mut self, path: &str) -> VfsResult<NodeId> {
        let (parent, name) = path::resolve_parent(&self.store, path, self.cursor)?;
        let id = self
            .store
            .create_dir(parent, name, self.config.default_permission)?;
        debug!(path = %self.store.path_of(id), "created directory");
        Ok(id)
    }

    /// Remove a file, or a directory with everything under it.
    ///
    /// If the cursor was inside the removed subtree it moves to the removed
    /// entry's parent.
    pub fn remove_entry(&mut self, path: &str) -> VfsResult<()> {
        let id = self.resolve(path)?;
        if id == self.store.root() {
            return Err(VfsError::invalid_path("cannot remove the root directory"));
        }
        let parent = self.store.node(id)?.parent();
        let cursor_inside = self.store.is_ancestor(id, self.cursor);
        let removed_path = self.store.path_of(id);

        let freed = self.store.remove(id)?;
        if cursor_inside {
            self.cursor = parent.unwrap_or_else(|| self.store.root());
        }
        debug!(path = %removed_path, freed, "removed entry");
        Ok(())
    }

    /// List a directory (the cursor when `path` is `None`), sorted by name.
    pub fn list_dir(&self, path: Option<&str>) -> VfsResult<Vec<DirEntry>> {
        let dir = match path {
            Some(p) => self.resolve_dir(p)?,
            None => self.cursor,
        };
        self.store
            .children(dir)?
            .into_iter()
            .map(|id| self.store.node(id).map(DirEntry::from_node))
            .collect()
    }

    /// Absolute path of the cursor.
    pub fn pwd(&self) -> String {
        self.store.path_of(self.cursor)
    }

    /// Move the cursor. The target must be a directory.
    pub fn cd(&mut self, path: &str) -> VfsResult<()> {
        let dir = self.resolve_dir(path)?;
        self.cursor = dir;
        debug!(cwd = %self.pwd(), "changed directory");
        Ok(())
    }

    /// Change a node's permission. `mode` is a digit `0`-`7` or `rwx` form.
    pub fn chmod(&mut self, path: &str, mode: &str) -> VfsResult<()> {
        let permission = Permission::parse(mode)?;
        self.set_permission(path, permission)
    }

    /// Change a node's permission to an already validated value.
    pub fn set_permission(&mut self, path: &str, permission: Permission) -> VfsResult<()> {
        let id = self.resolve(path)?;
        let node = self.store.node_mut(id)?;
        node.permission = permission;
        node.touch();
        debug!(path = %self.store.path_of(id), mode = %permission, "changed permission");
        Ok(())
    }

    /// Attributes of the node at `path`.
    pub fn stat(&self, path: &str) -> VfsResult<FileAttr> {
        let id = self.resolve(path)?;
        Ok(self.store.node(id)?.attr())
    }

    /// Whether `path` resolves.
    pub fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }
}
