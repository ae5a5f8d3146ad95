// src/processor/relocate.rs

//! Moving processed files into the mirrored target tree.

use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::errors::{DirpubError, Result};
use crate::fs::FileSystem;

/// Path of `file` (under `source_root`) re-rooted under `target_root`.
pub fn mirrored_path(source_root: &Path, target_root: &Path, file: &Path) -> Option<PathBuf> {
    let rel = file.strip_prefix(source_root).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(target_root.join(rel))
}

/// Move `source` to `destination`, replacing whatever file is already there
/// and creating missing parent directories.
///
/// Any failure leaves `source` where it was.
pub fn move_to_target(fs: &dyn FileSystem, source: &Path, destination: &Path) -> Result<()> {
    let failed = |reason: String| DirpubError::MoveFailed {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        reason,
    };

    if fs.exists(destination) {
        warn!(
            destination = ?destination,
            "file already exists in target directory, overwriting"
        );
        fs.remove_file(destination)
            .map_err(|err| failed(format!("unable to delete existing file: {err:#}")))?;
    } else if let Some(parent) = destination.parent() {
        if !fs.is_dir(parent) {
            trace!(dir = ?parent, "creating target directory structure");
            fs.create_dir_all(parent).map_err(|err| {
                failed(format!("unable to create target directory structure: {err:#}"))
            })?;
        }
    }

    fs.rename(source, destination)
        .map_err(|err| failed(format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn mirrored_path_keeps_relative_layout() {
        assert_eq!(
            mirrored_path(Path::new("/in"), Path::new("/out"), Path::new("/in/a/b.xml")),
            Some(PathBuf::from("/out/a/b.xml"))
        );
        assert_eq!(
            mirrored_path(Path::new("/in"), Path::new("/out"), Path::new("/elsewhere/b.xml")),
            None
        );
        assert_eq!(mirrored_path(Path::new("/in"), Path::new("/out"), Path::new("/in")), None);
    }

    #[test]
    fn creates_missing_parents() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/a/b.xml", "x");
        fs.add_dir("/out");

        move_to_target(&fs, Path::new("/in/a/b.xml"), Path::new("/out/a/b.xml")).unwrap();
        assert_eq!(fs.contents("/out/a/b.xml").as_deref(), Some(&b"x"[..]));
        assert!(!fs.exists(Path::new("/in/a/b.xml")));
    }

    #[test]
    fn failing_delete_of_existing_target_aborts() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/b.xml", "new");
        fs.add_file("/out/b.xml", "old");
        fs.fail_removes(true);

        let err = move_to_target(&fs, Path::new("/in/b.xml"), Path::new("/out/b.xml")).unwrap_err();
        assert!(matches!(err, DirpubError::MoveFailed { .. }));
        assert_eq!(fs.contents("/in/b.xml").as_deref(), Some(&b"new"[..]));
        assert_eq!(fs.contents("/out/b.xml").as_deref(), Some(&b"old"[..]));
    }

    #[test]
    fn failing_directory_creation_aborts() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/a/b.xml", "x");
        fs.add_dir("/out");
        fs.fail_create_dirs(true);

        let err =
            move_to_target(&fs, Path::new("/in/a/b.xml"), Path::new("/out/a/b.xml")).unwrap_err();
        assert!(err.to_string().contains("target directory structure"));
        assert!(fs.exists(Path::new("/in/a/b.xml")));
    }

    #[test]
    fn failing_rename_leaves_source() {
        let fs = MockFileSystem::new();
        fs.add_file("/in/b.xml", "x");
        fs.add_dir("/out");
        fs.fail_renames(true);

        assert!(move_to_target(&fs, Path::new("/in/b.xml"), Path::new("/out/b.xml")).is_err());
        assert!(fs.exists(Path::new("/in/b.xml")));
        assert!(!fs.exists(Path::new("/out/b.xml")));
    }
}
