//! Path resolution.
//!
//! Paths are `/`-separated. A leading `/` starts at the root, anything
//! else starts at the caller's directory (normally the cursor). Empty
//! segments are skipped, `.` stays put and `..` climbs one level, stopping
//! at the root.

use crate::error::{VfsError, VfsResult};
use crate::node::NodeId;
use crate::store::NodeStore;

/// Path separator.
pub const SEPARATOR: char = '/';

/// A path split into its start point and segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath<'a> {
    /// Starts at the root rather than the cursor.
    pub absolute: bool,
    /// Non-empty segments, `.`/`..` included.
    pub segments: Vec<&'a str>,
}

impl<'a> ParsedPath<'a> {
    /// Split a path. The empty string is not a path.
    pub fn parse(path: &'a str) -> VfsResult<Self> {
        if path.is_empty() {
            return Err(VfsError::invalid_path("empty path"));
        }
        Ok(Self {
            absolute: path.starts_with(SEPARATOR),
            segments: path.split(SEPARATOR).filter(|s| !s.is_empty()).collect(),
        })
    }

    /// Split off the final segment, which names the entry an operation
    /// creates. Returns `None` when there is no final segment (`/`).
    pub fn split_last(&self) -> Option<(ParsedPath<'a>, &'a str)> {
        let (last, init) = self.segments.split_last()?;
        Some((
            ParsedPath {
                absolute: self.absolute,
                segments: init.to_vec(),
            },
            *last,
        ))
    }
}

/// Resolve `path` to a node, starting from `from` for relative paths.
pub fn resolve(store: &NodeStore, path: &str, from: NodeId) -> VfsResult<NodeId> {
    let parsed = ParsedPath::parse(path)?;
    walk(store, &parsed, from)
}

/// Resolve everything but the final segment of `path`, which must land on
/// a directory, and return it along with the (validated) final name.
pub fn resolve_parent<'a>(
    store: &NodeStore,
    path: &'a str,
    from: NodeId,
) -> VfsResult<(NodeId, &'a str)> {
    let parsed = ParsedPath::parse(path)?;
    let (dir_path, name) = parsed
        .split_last()
        .ok_or_else(|| VfsError::invalid_name(path))?;
    store.validate_name(name)?;

    let parent = walk(store, &dir_path, from)?;
    if !store.node(parent)?.is_dir() {
        return Err(VfsError::not_a_directory(store.path_of(parent)));
    }
    Ok((parent, name))
}

fn walk(store: &NodeStore, parsed: &ParsedPath<'_>, from: NodeId) -> VfsResult<NodeId> {
    let mut current = if parsed.absolute { store.root() } else { from };
    // Fail early on a stale starting point.
    store.node(current)?;

    for &segment in &parsed.segments {
        match segment {
            "." => {}
            ".." => {
                if let Some(parent) = store.node(current)?.parent() {
                    current = parent;
                }
            }
            name => {
                let node = store.node(current)?;
                if !node.is_dir() {
                    return Err(VfsError::not_a_directory(store.path_of(current)));
                }
                current = store
                    .child(current, name)
                    .ok_or_else(|| VfsError::not_found(store.child_path(current, name)))?;
            }
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Permission;

    /// Builds `/a/b/f` and returns (store, a, b, f).
    fn tree() -> (NodeStore, NodeId, NodeId, NodeId) {
        let mut s = NodeStore::default();
        let a = s.create_dir(s.root(), "a", Permission::default()).unwrap();
        let b = s.create_dir(a, "b", Permission::default()).unwrap();
        let f = s.create_file(b, "f", Permission::default()).unwrap();
        (s, a, b, f)
    }

    #[test]
    fn test_parse() {
        let p = ParsedPath::parse("/a//b/").unwrap();
        assert!(p.absolute);
        assert_eq!(p.segments, vec!["a", "b"]);

        let p = ParsedPath::parse("./x").unwrap();
        assert!(!p.absolute);
        assert_eq!(p.segments, vec![".", "x"]);

        assert!(matches!(ParsedPath::parse(""), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_absolute_and_relative() {
        let (s, a, b, f) = tree();
        let root = s.root();
        assert_eq!(resolve(&s, "/", b).unwrap(), root);
        assert_eq!(resolve(&s, "/a/b/f", root).unwrap(), f);
        assert_eq!(resolve(&s, "b/f", a).unwrap(), f);
        assert_eq!(resolve(&s, "f", b).unwrap(), f);
        assert_eq!(resolve(&s, ".", b).unwrap(), b);
    }

    #[test]
    fn test_dot_dot() {
        let (s, a, b, f) = tree();
        let root = s.root();
        assert_eq!(resolve(&s, "..", b).unwrap(), a);
        assert_eq!(resolve(&s, "../..", b).unwrap(), root);
        // Climbing past the root stays at the root.
        assert_eq!(resolve(&s, "../../../..", b).unwrap(), root);
        assert_eq!(resolve(&s, "/..", b).unwrap(), root);
        assert_eq!(resolve(&s, "../b/./f", b).unwrap(), f);
    }

    #[test]
    fn test_missing_segment() {
        let (s, _, b, _) = tree();
        let err = resolve(&s, "nope", b).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(p) if p == "/a/b/nope"));
        let err = resolve(&s, "/a/x/f", b).unwrap_err();
        assert!(matches!(err, VfsError::NotFound(p) if p == "/a/x"));
    }

    #[test]
    fn test_descend_through_file() {
        let (s, _, b, _) = tree();
        let err = resolve(&s, "f/g", b).unwrap_err();
        assert!(matches!(err, VfsError::WrongKind { .. }));
    }

    #[test]
    fn test_resolve_parent() {
        let (s, a, b, _) = tree();
        let root = s.root();
        assert_eq!(resolve_parent(&s, "new", b).unwrap(), (b, "new"));
        assert_eq!(resolve_parent(&s, "/a/new", b).unwrap(), (a, "new"));
        assert_eq!(resolve_parent(&s, "../new/", b).unwrap(), (a, "new"));
        assert_eq!(resolve_parent(&s, "/top", b).unwrap(), (root, "top"));

        for bad in ["/", ".", "..", "a/.."] {
            let err = resolve_parent(&s, bad, root).unwrap_err();
            assert!(matches!(err, VfsError::InvalidName(_)), "{bad:?}: {err:?}");
        }
        assert!(matches!(
            resolve_parent(&s, "/a/b/f/x", root),
            Err(VfsError::WrongKind { .. })
        ));
        assert!(matches!(
            resolve_parent(&s, "/missing/x", root),
            Err(VfsError::NotFound(_))
        ));
    }
}
