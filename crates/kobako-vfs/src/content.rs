//! File content operations: create-with-content, read, append, write,
//! copy and move.

use tracing::{debug, warn};

use crate::error::{VfsError, VfsResult};
use crate::filesystem::FileSystem;
use crate::node::{NodeId, NodeKind};
use crate::path;

impl FileSystem {
    /// Create a file and set its content in one step.
    pub fn create_file_with_content(
        &mut self,
        path: &str,
        content: impl Into<Vec<u8>>,
    ) -> VfsResult<NodeId> {
        let (parent, name) = path::resolve_parent(&self.store, path, self.cursor)?;
        let content = content.into();
        let len = content.len();
        let id = self.store.create_file_with_content(
            parent,
            name,
            self.config.default_permission,
            content,
        )?;
        debug!(path = %self.store.path_of(id), len, "created file with content");
        Ok(id)
    }

    /// Full content of a file.
    pub fn read_file(&self, path: &str) -> VfsResult<Vec<u8>> {
        let id = self.resolve_file(path)?;
        Ok(self.file_content(id)?.to_vec())
    }

    /// Content of a file as UTF-8, replacing invalid sequences.
    pub fn read_to_string(&self, path: &str) -> VfsResult<String> {
        let id = self.resolve_file(path)?;
        Ok(String::from_utf8_lossy(self.file_content(id)?).into_owned())
    }

    /// Append bytes to a file.
    pub fn append_file(&mut self, path: &str, data: impl AsRef<[u8]>) -> VfsResult<()> {
        let id = self.resolve_file(path)?;
        let data = data.as_ref();
        self.with_content_mut(id, |content| content.extend_from_slice(data))?;
        debug!(path = %self.store.path_of(id), len = data.len(), "appended to file");
        Ok(())
    }

    /// Replace a file's content.
    pub fn write_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> VfsResult<()> {
        let id = self.resolve_file(path)?;
        let data = data.into();
        let len = data.len();
        self.with_content_mut(id, |content| *content = data)?;
        debug!(path = %self.store.path_of(id), len, "wrote file");
        Ok(())
    }

    /// Append the content of file `src` onto file `dst`.
    pub fn append_from(&mut self, src: &str, dst: &str) -> VfsResult<()> {
        let src_id = self.resolve_file(src)?;
        let dst_id = self.resolve_file(dst)?;
        let data = self.file_content(src_id)?.clone();
        self.with_content_mut(dst_id, |content| content.extend_from_slice(&data))?;
        debug!(
            src = %self.store.path_of(src_id),
            dst = %self.store.path_of(dst_id),
            len = data.len(),
            "appended file onto file"
        );
        Ok(())
    }

    /// Deep-copy a file or directory tree to `dst`.
    ///
    /// If `dst` is an existing directory the copy goes inside it under the
    /// source's name. Nothing is created unless the whole copy succeeds.
    pub fn copy_entry(&mut self, src: &str, dst: &str) -> VfsResult<NodeId> {
        let src_id = self.resolve(src)?;
        if src_id == self.store.root() {
            return Err(VfsError::invalid_path("cannot copy the root directory"));
        }
        let (parent, name) = self.destination(src_id, dst)?;
        self.store.check_attach(None, parent, &name)?;

        let copy = self.store.duplicate(src_id)?;
        if let Err(e) = self.store.attach(copy, parent, &name) {
            // Removing a detached node frees its arena entries.
            if let Err(cleanup) = self.store.remove(copy) {
                warn!(error = %cleanup, "failed to free detached copy");
            }
            return Err(e);
        }
        debug!(
            src = %self.store.path_of(src_id),
            dst = %self.store.path_of(copy),
            nodes = self.store.subtree_len(copy),
            "copied entry"
        );
        Ok(copy)
    }

    /// Move (and possibly rename) a file or directory to `dst`.
    ///
    /// If `dst` is an existing directory the entry goes inside it. Moving a
    /// directory into itself or one of its descendants is a
    /// [`VfsError::CycleDetected`].
    pub fn move_entry(&mut self, src: &str, dst: &str) -> VfsResult<()> {
        let src_id = self.resolve(src)?;
        if src_id == self.store.root() {
            return Err(VfsError::invalid_path("cannot move the root directory"));
        }
        let from = self.store.path_of(src_id);
        let (parent, name) = self.destination(src_id, dst)?;
        self.store.reparent(src_id, parent, &name)?;
        debug!(src = %from, dst = %self.store.path_of(src_id), "moved entry");
        Ok(())
    }

    fn file_content(&self, id: NodeId) -> VfsResult<&Vec<u8>> {
        self.store
            .node(id)?
            .content()
            .ok_or_else(|| VfsError::is_a_directory(self.store.path_of(id)))
    }

    fn with_content_mut(&mut self, id: NodeId, f: impl FnOnce(&mut Vec<u8>)) -> VfsResult<()> {
        self.expect_kind(id, NodeKind::File)?;
        let node = self.store.node_mut(id)?;
        if let Some(content) = node.content_mut() {
            f(content);
        }
        node.touch();
        Ok(())
    }
}
