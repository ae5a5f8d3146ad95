// src/watch/filter.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Selects the entries a scan looks at.
///
/// Directories always pass (hidden ones are skipped later, at recursion
/// time). Files pass when their lowercased name ends with the configured
/// extension. Each rejected file is reported once for the lifetime of the
/// filter, so a file parked in the drop folder does not flood the log on
/// every poll.
#[derive(Debug)]
pub struct ExtensionFilter {
    extension: String,
    root: PathBuf,
    skipped: HashSet<String>,
}

impl ExtensionFilter {
    /// `extension` is matched as a suffix, leading dot included (`.xml`).
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            extension: extension.to_lowercase(),
            root: root.into(),
            skipped: HashSet::new(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn matches_name(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .is_some_and(|n| n.ends_with(&self.extension))
    }

    pub fn accept(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        if fs.is_dir(path) || self.matches_name(path) {
            return true;
        }

        let rel = relative_str(&self.root, path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        if self.skipped.insert(rel.clone()) {
            warn!(
                file = %rel,
                extension = %self.extension,
                "found file without the expected extension, skipping"
            );
        }
        false
    }

    /// Number of distinct rejected files seen so far.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn accepts_directories_and_matching_files_case_insensitively() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/a.xml", "a");
        fs.add_file("/drop/B.XML", "b");
        fs.add_dir("/drop/sub.d");

        let mut filter = ExtensionFilter::new("/drop", ".xml");
        assert!(filter.accept(&fs, Path::new("/drop/a.xml")));
        assert!(filter.accept(&fs, Path::new("/drop/B.XML")));
        assert!(filter.accept(&fs, Path::new("/drop/sub.d")));
        assert_eq!(filter.skipped_count(), 0);
    }

    #[test]
    fn configured_extension_is_lowercased() {
        let filter = ExtensionFilter::new("/drop", ".XML");
        assert_eq!(filter.extension(), ".xml");
        assert!(filter.matches_name(Path::new("/drop/a.xml")));
    }

    #[test]
    fn rejected_files_are_remembered_once() {
        let fs = MockFileSystem::new();
        fs.add_file("/drop/b.txt", "b");
        fs.add_file("/drop/.hidden.xml", "h");

        let mut filter = ExtensionFilter::new("/drop", ".xml");
        assert!(!filter.accept(&fs, Path::new("/drop/b.txt")));
        assert!(!filter.accept(&fs, Path::new("/drop/b.txt")));
        assert_eq!(filter.skipped_count(), 1);

        // Hidden files are still subject to the extension match only.
        assert!(filter.accept(&fs, Path::new("/drop/.hidden.xml")));
    }
}
