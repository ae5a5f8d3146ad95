// src/watch/detector.rs

//! Polling change detection.
//!
//! A poll walks the watched tree and compares what it finds against the
//! modification times recorded on the previous poll. Per directory:
//!
//! 1. list the children that pass the [`ExtensionFilter`];
//! 2. check every known file below the directory: a changed mtime yields
//!    `Modified`, a missing file is queued for deletion;
//! 3. drop the queued paths from the state and emit `Deleted`;
//! 4. record unknown files and emit `Added`, recursing into non-hidden
//!    subdirectories.
//!
//! Symbolic links to directories are not followed; every recorded path is
//! the one reached through real directories below the root. Links to files
//! are treated as files.
//!
//! Events are handed to the caller as they are produced, so a slow consumer
//! holds up the rest of the scan.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info_span, trace, warn, Span};

use crate::errors::{DirpubError, Result};
use crate::fs::FileSystem;
use crate::watch::event::FileEvent;
use crate::watch::filter::ExtensionFilter;
use crate::watch::path_utils::{first_component_below, is_hidden};

#[derive(Debug)]
enum ChildKind {
    Dir,
    File(SystemTime),
}

#[derive(Debug)]
struct Child {
    path: PathBuf,
    kind: ChildKind,
}

/// Recursive mtime-based scanner over a single root directory.
#[derive(Debug)]
pub struct ChangeDetector {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    filter: ExtensionFilter,
    /// Known files and the modification time seen on their last observation.
    /// Ordered by path so the files below a directory form one range.
    known: BTreeMap<PathBuf, SystemTime>,
    /// Paths found missing in the current directory step; never mutated
    /// while `known` is being walked.
    pending_deletions: Vec<PathBuf>,
    span: Span,
}

impl ChangeDetector {
    /// Build a detector for `root`, which must be an existing directory.
    ///
    /// The root is canonicalized once so every recorded path is absolute.
    pub fn new(fs: Arc<dyn FileSystem>, root: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let requested = root.as_ref();
        let root = fs
            .canonicalize(requested)
            .map_err(|_| DirpubError::NotADirectory(requested.to_path_buf()))?;
        if !fs.is_dir(&root) {
            return Err(DirpubError::NotADirectory(requested.to_path_buf()));
        }

        let span = info_span!("detector", root = %root.display());
        Ok(Self {
            filter: ExtensionFilter::new(root.clone(), extension),
            fs,
            root,
            known: BTreeMap::new(),
            pending_deletions: Vec::new(),
            span,
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        self.filter.extension()
    }

    pub fn is_known(&self, path: &Path) -> bool {
        self.known.contains_key(path)
    }

    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    /// Run one poll over the whole tree, handing each event to `emit`.
    pub fn poll(&mut self, emit: &mut dyn FnMut(FileEvent)) {
        let span = self.span.clone();
        let _enter = span.enter();

        let root = self.root.clone();
        self.scan_directory(&root, emit);
    }

    /// Convenience wrapper around [`poll`](Self::poll) that collects the events.
    pub fn poll_collect(&mut self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        self.poll(&mut |event| events.push(event));
        events
    }

    fn scan_directory(&mut self, dir: &Path, emit: &mut dyn FnMut(FileEvent)) {
        trace!(dir = ?dir, "scanning directory");

        let Some(children) = self.list_children(dir) else {
            return;
        };

        let below = self
            .known
            .range_mut::<Path, _>((Bound::Included(dir), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(dir));
        for (path, last_seen) in below {
            let Some(first) = first_component_below(dir, path) else {
                continue;
            };

            if path.parent() == Some(dir) {
                let current = children.iter().find(|c| c.path == *path);
                match current {
                    Some(Child {
                        kind: ChildKind::File(modified),
                        ..
                    }) => {
                        if *modified == *last_seen {
                            trace!(file = ?path, "file has not changed");
                        } else {
                            debug!(file = ?path, "file changed");
                            *last_seen = *modified;
                            emit(FileEvent::Modified(path.clone()));
                        }
                    }
                    // Gone, or replaced by a directory.
                    _ => self.pending_deletions.push(path.clone()),
                }
            } else {
                // Deeper descendants belong to a subdirectory scan; if that
                // subdirectory is no longer walked, its files are gone too.
                let subdir = dir.join(first);
                let walked = !is_hidden(&subdir)
                    && children
                        .iter()
                        .any(|c| c.path == subdir && matches!(c.kind, ChildKind::Dir));
                if !walked {
                    self.pending_deletions.push(path.clone());
                }
            }
        }

        for path in std::mem::take(&mut self.pending_deletions) {
            debug!(file = ?path, "file deleted");
            self.known.remove(&path);
            emit(FileEvent::Deleted(path));
        }

        for child in children {
            match child.kind {
                ChildKind::Dir => {
                    if is_hidden(&child.path) {
                        trace!(dir = ?child.path, "skipping hidden directory");
                        continue;
                    }
                    self.scan_directory(&child.path, emit);
                }
                ChildKind::File(modified) => {
                    if self.known.contains_key(&child.path) {
                        continue;
                    }
                    debug!(file = ?child.path, "file added");
                    self.known.insert(child.path.clone(), modified);
                    emit(FileEvent::Added(child.path));
                }
            }
        }
    }

    /// Children of `dir` that pass the filter, with their current mtime.
    ///
    /// Returns `None` when the directory cannot be listed; the caller then
    /// leaves everything below it untouched for this poll.
    fn list_children(&mut self, dir: &Path) -> Option<Vec<Child>> {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?dir, error = %err, "unable to list directory, skipping it this poll");
                return None;
            }
        };

        let mut children = Vec::with_capacity(entries.len());
        for path in entries {
            if !self.filter.accept(self.fs.as_ref(), &path) {
                continue;
            }
            if self.fs.is_dir(&path) {
                if self.fs.is_symlink(&path) {
                    debug!(dir = ?path, "not following symlinked directory");
                    continue;
                }
                children.push(Child {
                    path,
                    kind: ChildKind::Dir,
                });
                continue;
            }
            match self.fs.modified(&path) {
                Ok(modified) => children.push(Child {
                    path,
                    kind: ChildKind::File(modified),
                }),
                Err(err) => {
                    // Removed between the listing and the stat.
                    debug!(file = ?path, error = %err, "unable to read modification time");
                }
            }
        }
        Some(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn detector(fs: &MockFileSystem) -> ChangeDetector {
        ChangeDetector::new(Arc::new(fs.clone()), "/drop", ".xml").unwrap()
    }

    #[test]
    fn rejects_missing_root() {
        let fs = MockFileSystem::new();
        let err = ChangeDetector::new(Arc::new(fs), "/nope", ".xml").unwrap_err();
        assert!(matches!(err, DirpubError::NotADirectory(_)));
    }

    #[test]
    fn rejects_file_as_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop.xml", "x");
        let err = ChangeDetector::new(Arc::new(fs), "/drop.xml", ".xml").unwrap_err();
        assert!(matches!(err, DirpubError::NotADirectory(_)));
    }

    #[test]
    fn modification_and_deletion_precede_additions_in_a_directory() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/old.xml", "1");
        fs.add_file("/drop/gone.xml", "1");
        let mut det = detector(&fs);
        assert_eq!(det.poll_collect().len(), 2);

        fs.touch("/drop/old.xml");
        fs.remove("/drop/gone.xml");
        fs.add_file("/drop/new.xml", "1");

        let events = det.poll_collect();
        assert_eq!(
            events,
            vec![
                FileEvent::Modified(PathBuf::from("/drop/old.xml")),
                FileEvent::Deleted(PathBuf::from("/drop/gone.xml")),
                FileEvent::Added(PathBuf::from("/drop/new.xml")),
            ]
        );
    }

    #[test]
    fn file_replaced_by_directory_is_deleted_then_walked() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/x.xml", "1");
        let mut det = detector(&fs);
        det.poll_collect();

        fs.remove("/drop/x.xml");
        fs.add_file("/drop/x.xml/inner.xml", "2");

        let events = det.poll_collect();
        assert_eq!(
            events,
            vec![
                FileEvent::Deleted(PathBuf::from("/drop/x.xml")),
                FileEvent::Added(PathBuf::from("/drop/x.xml/inner.xml")),
            ]
        );
    }

    #[test]
    fn unlistable_directory_keeps_its_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/sub/a.xml", "1");
        let mut det = detector(&fs);
        det.poll_collect();

        fs.fail_listings_of("/drop/sub");
        fs.remove("/drop/sub/a.xml");
        assert!(det.poll_collect().is_empty());
        assert!(det.is_known(Path::new("/drop/sub/a.xml")));

        fs.clear_failures();
        assert_eq!(
            det.poll_collect(),
            vec![FileEvent::Deleted(PathBuf::from("/drop/sub/a.xml"))]
        );
    }

    #[test]
    fn sibling_with_shared_name_prefix_is_not_below_directory() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/sub/a.xml", "1");
        fs.add_file("/drop/sub-b/a.xml", "1");
        fs.add_file("/drop/sub.xml", "1");
        let mut det = detector(&fs);
        assert_eq!(det.poll_collect().len(), 3);

        fs.remove("/drop/sub");
        assert_eq!(
            det.poll_collect(),
            vec![FileEvent::Deleted(PathBuf::from("/drop/sub/a.xml"))]
        );
        assert!(det.is_known(Path::new("/drop/sub-b/a.xml")));
        assert!(det.is_known(Path::new("/drop/sub.xml")));
    }

    #[test]
    fn modified_compares_exact_timestamps() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/a.xml", "1");
        let mut det = detector(&fs);
        det.poll_collect();

        // Rewriting content without moving the mtime goes unnoticed.
        let before = fs.modified(Path::new("/drop/a.xml")).unwrap();
        fs.add_file("/drop/a.xml", "2");
        fs.set_modified("/drop/a.xml", before);
        assert!(det.poll_collect().is_empty());
    }
}
