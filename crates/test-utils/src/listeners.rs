//! Listeners for watch-loop tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use dirpub::errors::Result;
use dirpub::watch::{DirectoryListener, FileEvent};

/// Records every event it receives. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<FileEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<FileEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl DirectoryListener for RecordingListener {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_event(&mut self, event: &FileEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Fails every event. Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct FailingListener {
    calls: Arc<AtomicUsize>,
}

impl FailingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectoryListener for FailingListener {
    fn name(&self) -> &str {
        "failing"
    }

    fn on_event(&mut self, event: &FileEvent) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("refusing {event}").into())
    }
}

/// Panics on every event. Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct PanickingListener {
    calls: Arc<AtomicUsize>,
}

impl PanickingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectoryListener for PanickingListener {
    fn name(&self) -> &str {
        "panicking"
    }

    fn on_event(&mut self, event: &FileEvent) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("listener blew up on {event}");
    }
}
