// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher and processor.

use std::path::{Component, Path};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// True if the final component of `path` starts with `.`.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// First component of `path` below `dir`, if `path` is a strict descendant.
///
/// For `dir = /a` and `path = /a/b/c.xml` this is `b`.
pub fn first_component_below<'a>(dir: &Path, path: &'a Path) -> Option<&'a Path> {
    let rel = path.strip_prefix(dir).ok()?;
    match rel.components().next()? {
        Component::Normal(name) => Some(Path::new(name)),
        _ => None,
    }
}
