//! Tree rendering for diagnostics.

use std::fmt::Write;

use crate::filesystem::FileSystem;
use crate::node::NodeId;
use crate::store::NodeStore;

impl FileSystem {
    /// Render the whole tree, one node per line.
    ///
    /// ```text
    /// / rw-
    /// ├── bin/ rwx
    /// │   └── hello rwx 12B
    /// └── notes rw- 0B  <- cwd
    /// ```
    ///
    /// Directories carry a trailing `/`, files their size; the cursor's
    /// node is marked.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        let root = self.store.root();
        line(&self.store, root, "/", self.cursor, &mut out);
        render_children(&self.store, root, self.cursor, &mut out);
        out
    }
}

/// Depth-first, children in name order. Each stack entry carries the
/// prefix of its line and whether it is the last of its siblings.
fn render_children(store: &NodeStore, root: NodeId, cursor: NodeId, out: &mut String) {
    let mut stack: Vec<(NodeId, String, bool)> = Vec::new();
    push_children(store, root, "", &mut stack);

    while let Some((id, prefix, last)) = stack.pop() {
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(&prefix);
        out.push_str(branch);
        let name = store.get(id).map(|n| n.name().to_string()).unwrap_or_default();
        line(store, id, &name, cursor, out);
        push_children(store, id, &format!("{prefix}{indent}"), &mut stack);
    }
}

/// Queue a directory's children so they pop in name order.
fn push_children(
    store: &NodeStore,
    dir: NodeId,
    prefix: &str,
    stack: &mut Vec<(NodeId, String, bool)>,
) {
    let Ok(children) = store.children(dir) else {
        return;
    };
    let count = children.len();
    for (i, child) in children.into_iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), i + 1 == count));
    }
}

fn line(store: &NodeStore, id: NodeId, label: &str, cursor: NodeId, out: &mut String) {
    let Some(node) = store.get(id) else {
        return;
    };
    let _ = if node.is_dir() {
        let slash = if label.ends_with('/') { "" } else { "/" };
        write!(out, "{label}{slash} {}", node.permission().symbolic())
    } else {
        write!(out, "{label} {} {}B", node.permission().symbolic(), node.size())
    };
    if id == cursor {
        out.push_str("  <- cwd");
    }
    out.push('\n');
}
