// src/watch/event.rs

//! Change events and the listener seam the watch loop dispatches through.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use tracing::error;

use crate::errors::Result;

/// A single change observed by the change detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileEvent {
    Added(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Added(p) | FileEvent::Modified(p) | FileEvent::Deleted(p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FileEvent::Added(_) => "added",
            FileEvent::Modified(_) => "modified",
            FileEvent::Deleted(_) => "deleted",
        }
    }
}

impl fmt::Display for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind(), self.path())
    }
}

/// Receiver of change events.
///
/// Called synchronously on the watch thread. Returning `Err` is the normal
/// way to report a per-event failure; the watch loop logs it and moves on.
pub trait DirectoryListener: Send {
    /// Short name used in log output.
    fn name(&self) -> &str {
        "listener"
    }

    fn on_event(&mut self, event: &FileEvent) -> Result<()>;
}

/// Ordered set of listeners; delivery follows registration order.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Vec<Box<dyn DirectoryListener>>,
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.listeners.iter().map(|l| l.name()).collect();
        f.debug_struct("ListenerSet").field("listeners", &names).finish()
    }
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, listener: Box<dyn DirectoryListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener in order.
    ///
    /// Errors and panics raised by a listener are contained here so the
    /// remaining listeners still see the event and the watch loop keeps
    /// polling.
    pub fn dispatch(&mut self, event: &FileEvent) {
        for listener in self.listeners.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(
                        listener = listener.name(),
                        event = event.kind(),
                        path = ?event.path(),
                        error = %err,
                        "listener failed to handle event"
                    );
                }
                Err(_) => {
                    error!(
                        listener = listener.name(),
                        event = event.kind(),
                        path = ?event.path(),
                        "listener panicked while handling event"
                    );
                }
            }
        }
    }
}
