//! Thread-safe handle to one filesystem.
//!
//! All operations on a [`SharedFileSystem`] go through one exclusive lock.
//! `exec` holds the lock only for the permission gate and content read;
//! the engine runs after it is released.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

use crate::error::VfsResult;
use crate::exec::{self, ExecResult};
use crate::filesystem::FileSystem;

/// Cloneable, lock-protected [`FileSystem`].
#[derive(Debug, Clone, Default)]
pub struct SharedFileSystem {
    inner: Arc<Mutex<FileSystem>>,
}

impl SharedFileSystem {
    pub fn new(fs: FileSystem) -> Self {
        Self {
            inner: Arc::new(Mutex::new(fs)),
        }
    }

    /// Lock for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, FileSystem> {
        self.inner.lock()
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut FileSystem) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Gated execution; the lock is released before the engine runs.
    pub async fn exec(&self, path: &str) -> VfsResult<ExecResult> {
        let (engine, source) = {
            let fs = self.inner.lock();
            (fs.engine.clone(), fs.gate(path)?)
        };
        exec::dispatch(engine, source).await
    }
}

impl From<FileSystem> for SharedFileSystem {
    fn from(fs: FileSystem) -> Self {
        Self::new(fs)
    }
}
