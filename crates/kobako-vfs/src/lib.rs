//! # kobako-vfs
//!
//! In-memory virtual filesystem with a permission-gated executor.
//!
//! A [`FileSystem`] holds one tree of directories and byte-content files
//! plus a current-directory cursor. Files can be created, read, appended,
//! copied, moved and removed by path. A file whose permission grants
//! execute can be handed to an [`ExecutionEngine`] with
//! [`FileSystem::exec`].
//!
//! ## Design Decisions
//!
//! - **Arena store**: nodes live in a [`NodeStore`] keyed by [`NodeId`].
//!   Directories own their children; parent links are plain ids used for
//!   `..` and `pwd`.
//! - **All-or-nothing**: every operation validates before it mutates.
//! - **Execute is the only enforced bit**: read and write bits are carried
//!   and shown, never checked.
//! - **One lock**: [`SharedFileSystem`] wraps the whole filesystem in a
//!   single mutex for multi-threaded callers.

pub mod config;
mod content;
mod dump;
pub mod error;
pub mod exec;
pub mod filesystem;
pub mod node;
pub mod path;
pub mod permission;
pub mod shared;
pub mod snapshot;
pub mod store;

pub use config::{ConfigError, VfsConfig};
pub use error::{VfsError, VfsResult};
pub use exec::{ExecResult, ExecutionEngine, NoopEngine};
pub use filesystem::FileSystem;
pub use node::{DirEntry, FileAttr, NodeKind, NodeId};
pub use permission::Permission;
pub use shared::SharedFileSystem;
pub use snapshot::{Snapshot, SnapshotBody, SnapshotEntry};
pub use store::NodeStore;
