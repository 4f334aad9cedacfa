//! Location tree: a precomputed hierarchical view of the content root.
//!
//! Built once at server startup and consumed read-only by the directory
//! indexer to enumerate children. Rebuilding on content change is the
//! caller's concern.

use std::path::{Path, PathBuf};

/// A node in the location tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationNode {
    /// Base name of the entry (the root keeps its full directory name).
    pub name: String,
    /// True only for the content root itself.
    pub is_root: bool,
    /// Absolute filesystem path.
    pub path: PathBuf,
    /// URL path of the entry, including the configured prefix.
    pub relative_path: String,
    /// Children, present for directories only.
    pub children: Vec<LocationNode>,
}

impl LocationNode {
    /// Find the node whose absolute path matches `target`.
    #[must_use]
    pub fn find(&self, target: &Path) -> Option<&LocationNode> {
        if self.path == target {
            return Some(self);
        }
        // Children outside the target's ancestry can never contain it.
        if !target.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(target))
    }
}

/// Build a location tree for the content root.
///
/// `prefix` is the URL prefix the tree is mounted under (empty for the
/// site root). Metadata sidecar files (`meta_ext`) are not part of the
/// tree. Returns `None` when the root does not exist or is unreadable.
#[must_use]
pub fn build_tree(root: &Path, prefix: &str, meta_ext: &str) -> Option<LocationNode> {
    if !root.is_dir() {
        return None;
    }
    let name = root
        .file_name()
        .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
    let base = prefix.trim_end_matches('/');
    Some(LocationNode {
        name,
        is_root: true,
        path: root.to_path_buf(),
        relative_path: if base.is_empty() { "/".to_owned() } else { base.to_owned() },
        children: read_children(root, base, meta_ext),
    })
}

fn read_children(dir: &Path, base: &str, meta_ext: &str) -> Vec<LocationNode> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut children: Vec<LocationNode> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(meta_ext) {
                return None;
            }
            let path = entry.path();
            let relative_path = format!("{base}/{name}");
            let children = if path.is_dir() {
                read_children(&path, &relative_path, meta_ext)
            } else if path.is_file() {
                Vec::new()
            } else {
                return None;
            };
            Some(LocationNode {
                name,
                is_root: false,
                path,
                relative_path,
                children,
            })
        })
        .collect();

    children.sort_by(|a, b| a.name.cmp(&b.name));
    children
}
