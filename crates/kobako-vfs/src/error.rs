//! VFS error types.

use std::io;
use thiserror::Error;

use crate::node::NodeKind;

/// VFS error type.
///
/// Every façade operation either succeeds completely or returns one of
/// these with the tree left exactly as it was.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path resolution failed.
    #[error("no such entry: {0}")]
    NotFound(String),

    /// Resolved to a File where a Directory was expected, or vice versa.
    #[error("{}: {path}", wrong_kind_message(.expected))]
    WrongKind {
        /// The offending path.
        path: String,
        /// The kind the operation needed.
        expected: NodeKind,
    },

    /// Name collision on create/move/copy destination.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Empty name, separator in name, `.`/`..`, or too long.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Empty path, or a mutation aimed at the root itself.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Permission value outside the legal range.
    #[error("invalid permission: {0:?}")]
    InvalidPermission(String),

    /// Execute without the execute capability.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Move would place a directory inside its own subtree.
    #[error("cannot move {src} into its own subtree at {dst}")]
    CycleDetected {
        /// Source path.
        src: String,
        /// Destination path.
        dst: String,
    },

    /// The execution collaborator reported a fault.
    #[error("execution failed: {path}: {diagnostic}")]
    ExecutionFailed {
        /// Path of the executed file.
        path: String,
        /// Diagnostic returned by the collaborator.
        diagnostic: String,
    },

    /// Snapshot (de)serialization failed.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// I/O error while saving or loading a snapshot image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn wrong_kind_message(expected: &NodeKind) -> &'static str {
    match expected {
        NodeKind::Directory => "not a directory",
        NodeKind::File => "is a directory",
    }
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a WrongKind error for a path that should have been a directory.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::WrongKind {
            path: path.into(),
            expected: NodeKind::Directory,
        }
    }

    /// Create a WrongKind error for a path that should have been a file.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::WrongKind {
            path: path.into(),
            expected: NodeKind::File,
        }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an InvalidName error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an InvalidPermission error.
    pub fn invalid_permission(value: impl Into<String>) -> Self {
        Self::InvalidPermission(value.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a CycleDetected error.
    pub fn cycle_detected(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self::CycleDetected {
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Create an ExecutionFailed error.
    pub fn execution_failed(path: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            path: path.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// True for faults raised by the execution collaborator rather than the tree.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, Self::ExecutionFailed { .. })
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        let msg = e.to_string();
        match e {
            VfsError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::AlreadyExists(_) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::PermissionDenied(_) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::WrongKind {
                expected: NodeKind::Directory,
                ..
            } => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::WrongKind {
                expected: NodeKind::File,
                ..
            } => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::InvalidName(_)
            | VfsError::InvalidPath(_)
            | VfsError::InvalidPermission(_)
            | VfsError::CycleDetected { .. } => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
            VfsError::ExecutionFailed { .. } | VfsError::Snapshot(_) => io::Error::other(msg),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_kind_messages() {
        let e = VfsError::not_a_directory("/a/f");
        assert_eq!(e.to_string(), "not a directory: /a/f");

        let e = VfsError::is_a_directory("/a");
        assert_eq!(e.to_string(), "is a directory: /a");
    }

    #[test]
    fn test_io_error_mapping() {
        let io: io::Error = VfsError::not_found("x").into();
        assert_eq!(io.kind(), io::ErrorKind::NotFound);

        let io: io::Error = VfsError::is_a_directory("d").into();
        assert_eq!(io.kind(), io::ErrorKind::IsADirectory);

        let io: io::Error = VfsError::cycle_detected("/a", "/a/b").into();
        assert_eq!(io.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_execution_failure_is_distinct() {
        assert!(VfsError::execution_failed("/s", "boom").is_execution_failure());
        assert!(!VfsError::permission_denied("/s").is_execution_failure());
    }
}
