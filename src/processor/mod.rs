// src/processor/mod.rs

//! Publishing dropped files to the queue.
//!
//! [`FileProcessor`] is the listener that turns an `Added`/`Modified` event
//! into a queue message and, once the sink accepted it, moves the file into
//! the target tree. Nothing is retried: a file that could not be read, sent
//! or moved stays where it is until its modification time changes again.

pub mod headers;
pub mod relocate;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, info_span, trace, Span};

use crate::errors::{DirpubError, Result};
use crate::fs::FileSystem;
use crate::sink::{Message, QueueSink};
use crate::watch::event::{DirectoryListener, FileEvent};
use crate::watch::path_utils::relative_str;

pub use headers::HeaderParser;
pub use relocate::{mirrored_path, move_to_target};

pub struct FileProcessor<S: QueueSink> {
    fs: Arc<dyn FileSystem>,
    sink: S,
    source: PathBuf,
    target: PathBuf,
    header_mode: bool,
    parser: HeaderParser,
    span: Span,
}

impl<S: QueueSink> fmt::Debug for FileProcessor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProcessor")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("header_mode", &self.header_mode)
            .finish_non_exhaustive()
    }
}

impl<S: QueueSink> FileProcessor<S> {
    /// Both `source` and `target` must be existing directories.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        sink: S,
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        header_mode: bool,
    ) -> Result<Self> {
        let source = existing_dir(fs.as_ref(), source.as_ref())?;
        let target = existing_dir(fs.as_ref(), target.as_ref())?;
        let span = info_span!("processor", target_dir = %target.display());

        Ok(Self {
            fs,
            sink,
            source,
            target,
            header_mode,
            parser: HeaderParser::new()?,
            span,
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Canonical target directory.
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Turn file content into the message to publish.
    pub fn build_message(&self, content: String) -> Message {
        if self.header_mode {
            self.parser.parse(&content)
        } else {
            Message::text(content)
        }
    }

    /// Read, publish and relocate one file. Returns where the file ended up.
    pub fn process_file(&self, path: &Path) -> Result<PathBuf> {
        let _enter = self.span.enter();

        let rel = relative_str(&self.source, path).unwrap_or_else(|| path.display().to_string());
        info!(file = %rel, "processing file");

        let content = self
            .fs
            .read_to_string(path)
            .map_err(|err| DirpubError::ReadFailed {
                path: path.to_path_buf(),
                reason: format!("{err:#}, leaving it at its existing location"),
            })?;

        let message = self.build_message(content);
        self.sink.send(&message)?;
        info!(file = %rel, headers = message.headers.len(), "message published to queue");

        let destination = mirrored_path(&self.source, &self.target, path).ok_or_else(|| {
            DirpubError::MoveFailed {
                from: path.to_path_buf(),
                to: self.target.clone(),
                reason: "file is not inside the source directory".to_string(),
            }
        })?;
        trace!(from = ?path, to = ?destination, "moving processed file");
        move_to_target(self.fs.as_ref(), path, &destination)?;
        debug!(file = %rel, to = ?destination, "moved processed file");

        Ok(destination)
    }
}

impl<S: QueueSink> DirectoryListener for FileProcessor<S> {
    fn name(&self) -> &str {
        "file-processor"
    }

    fn on_event(&mut self, event: &FileEvent) -> Result<()> {
        match event {
            FileEvent::Added(path) | FileEvent::Modified(path) => {
                self.process_file(path)?;
            }
            FileEvent::Deleted(path) => {
                trace!(file = ?path, "ignoring deleted file");
            }
        }
        Ok(())
    }
}

fn existing_dir(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
    let canonical = fs
        .canonicalize(path)
        .map_err(|_| DirpubError::NotADirectory(path.to_path_buf()))?;
    if !fs.is_dir(&canonical) {
        return Err(DirpubError::NotADirectory(path.to_path_buf()));
    }
    Ok(canonical)
}
