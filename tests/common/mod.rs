#![allow(dead_code)]

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use dirpub::fs::mock::MockFileSystem;

pub type TestResult = Result<(), Box<dyn Error>>;

/// Mock filesystem with an empty `/drop` source and `/done` target.
pub fn drop_and_done() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_dir("/drop");
    fs.add_dir("/done");
    fs
}

/// Write `content` at `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Create `source` and `target` directories under a fresh temp dir and
/// return them canonicalized.
pub fn temp_tree() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&target).unwrap();
    let source = source.canonicalize().unwrap();
    let target = target.canonicalize().unwrap();
    (tmp, source, target)
}
