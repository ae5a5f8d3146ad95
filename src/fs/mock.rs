// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        modified: SystemTime,
    },
    Dir(Vec<String>), // List of child names
}

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, Default)]
struct Failures {
    reads: HashSet<PathBuf>,
    listings: HashSet<PathBuf>,
    remove: bool,
    create_dir: bool,
    rename: bool,
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Link path -> target path. Links show up in their parent's listing.
    symlinks: HashMap<PathBuf, PathBuf>,
    /// Logical clock backing modification times; bumped on every write.
    clock: u64,
    failures: Failures,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }

    fn ensure_dir_entry(&mut self, path: &Path) {
        if self.entries.contains_key(path) {
            return;
        }
        self.entries
            .insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_of(path) {
            if parent != path {
                // Avoid infinite loop at root
                self.ensure_dir_entry(&parent);
                self.link(&parent, path);
            }
        }
    }

    fn link(&mut self, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = self.entries.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    /// Follow symlinks in any prefix of `path`, giving up after a bounded
    /// number of hops like a real kernel would.
    fn resolve(&self, path: &Path) -> PathBuf {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_HOPS {
            let hop = self
                .symlinks
                .iter()
                .find(|(link, _)| current.starts_with(link))
                .and_then(|(link, target)| {
                    current
                        .strip_prefix(link)
                        .ok()
                        .map(|rest| target.join(rest))
                });
            match hop {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }

    fn get(&self, path: &Path) -> Option<&MockEntry> {
        self.entries.get(&self.resolve(path))
    }

    fn unlink(&mut self, child: &Path) {
        let Some(parent) = parent_of(child) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = self.entries.get_mut(&parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                children.retain(|c| c != name);
            }
        }
    }
}

const MAX_LINK_HOPS: usize = 40;

/// Parent directory of `path`, mapping a bare file name to `"."`.
fn parent_of(path: &Path) -> Option<PathBuf> {
    path.parent().map(|parent| {
        if parent.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            parent.to_path_buf()
        }
    })
}

/// In-memory filesystem with a logical modification clock.
///
/// Every `add_file`/`touch` advances the clock by one second, so a rewrite
/// is always observable as a modification. Directory listings come back in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        {
            let mut state = fs.state();
            // Ensure roots exist
            state.ensure_dir_entry(Path::new("/"));
            state.ensure_dir_entry(Path::new("."));
        }
        fs
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.state().ensure_dir_entry(path.as_ref());
    }

    /// Create or overwrite a file, advancing its modification time.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.state();
        let modified = state.tick();
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );

        // Ensure parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = parent_of(&path) {
            state.ensure_dir_entry(&parent);
            state.link(&parent, &path);
        }
    }

    /// Create a symbolic link at `link` pointing to `target`.
    pub fn add_symlink(&self, link: impl AsRef<Path>, target: impl AsRef<Path>) {
        let link = link.as_ref().to_path_buf();
        let mut state = self.state();
        state
            .symlinks
            .insert(link.clone(), target.as_ref().to_path_buf());
        if let Some(parent) = parent_of(&link) {
            state.ensure_dir_entry(&parent);
            state.link(&parent, &link);
        }
    }

    /// Bump the modification time of an existing file without touching its content.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let mut state = self.state();
        let now = state.tick();
        if let Some(MockEntry::File { modified, .. }) = state.entries.get_mut(path.as_ref()) {
            *modified = now;
        }
    }

    /// Force a specific modification time on an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        if let Some(MockEntry::File { modified, .. }) = self.state().entries.get_mut(path.as_ref()) {
            *modified = time;
        }
    }

    /// Remove a file or a whole directory subtree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state();
        state.entries.retain(|p, _| !p.starts_with(path));
        state.symlinks.retain(|p, _| !p.starts_with(path));
        state.unlink(path);
    }

    /// Current content of a file, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.state().entries.get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn fail_reads_of(&self, path: impl AsRef<Path>) {
        self.state()
            .failures
            .reads
            .insert(path.as_ref().to_path_buf());
    }

    pub fn fail_listings_of(&self, path: impl AsRef<Path>) {
        self.state()
            .failures
            .listings
            .insert(path.as_ref().to_path_buf());
    }

    pub fn clear_failures(&self) {
        self.state().failures = Failures::default();
    }

    pub fn fail_removes(&self, fail: bool) {
        self.state().failures.remove = fail;
    }

    pub fn fail_create_dirs(&self, fail: bool) {
        self.state().failures.create_dir = fail;
    }

    pub fn fail_renames(&self, fail: bool) {
        self.state().failures.rename = fail;
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.state();
        if state.failures.reads.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.state().get(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.state().get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.state().get(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.state().symlinks.contains_key(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Tests use absolute paths, so resolving links is all there is to do
        let state = self.state();
        let resolved = state.resolve(path);
        if state.entries.contains_key(&resolved) {
            Ok(resolved)
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.state().get(path) {
            Some(MockEntry::File { modified, .. }) => Ok(*modified),
            Some(MockEntry::Dir(_)) => Ok(UNIX_EPOCH),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.state();
        if state.failures.listings.contains(path) {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        if state.failures.remove {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        match state.entries.get(path) {
            Some(MockEntry::File { .. }) => {
                state.entries.remove(path);
                state.unlink(path);
                Ok(())
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        if state.failures.create_dir {
            return Err(anyhow!("Permission denied: {:?}", path));
        }
        if let Some(MockEntry::File { .. }) = state.entries.get(path) {
            return Err(anyhow!("File exists: {:?}", path));
        }
        state.ensure_dir_entry(path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state();
        if state.failures.rename {
            return Err(anyhow!("Permission denied: {:?} -> {:?}", from, to));
        }
        let parent = parent_of(to).ok_or_else(|| anyhow!("No parent for {:?}", to))?;
        if !matches!(state.entries.get(&parent), Some(MockEntry::Dir(_))) {
            return Err(anyhow!("No such directory: {:?}", parent));
        }
        if let Some(MockEntry::Dir(_)) = state.entries.get(to) {
            return Err(anyhow!("Is a directory: {:?}", to));
        }
        let entry = match state.entries.remove(from) {
            Some(entry @ MockEntry::File { .. }) => entry,
            Some(dir) => {
                state.entries.insert(from.to_path_buf(), dir);
                return Err(anyhow!("Is a directory: {:?}", from));
            }
            None => return Err(anyhow!("File not found: {:?}", from)),
        };
        state.unlink(from);
        state.entries.insert(to.to_path_buf(), entry);
        state.link(&parent, to);
        Ok(())
    }
}
