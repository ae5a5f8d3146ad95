// src/watch/watcher.rs

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info, info_span, trace, Span};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::detector::ChangeDetector;
use crate::watch::event::{DirectoryListener, ListenerSet};

/// Lower bound on the time between two polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Poll interval used when none is configured, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Convert a configured interval in seconds into the effective sleep.
pub fn poll_interval_from_secs(secs: u64) -> Duration {
    Duration::from_millis(secs.saturating_mul(1000)).max(MIN_POLL_INTERVAL)
}

/// Where the watch loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Scanning,
    Dispatching,
    Sleeping,
    Halted,
}

#[derive(Debug)]
struct LoopStatus {
    phase: LoopPhase,
    halted: bool,
    polls: u64,
}

/// Shared between the watch thread and its handle: the halt flag, the
/// current phase, and the condition variable that cuts a sleep short.
#[derive(Debug)]
struct LoopSignal {
    status: Mutex<LoopStatus>,
    wake: Condvar,
}

impl LoopSignal {
    fn new() -> Self {
        Self {
            status: Mutex::new(LoopStatus {
                phase: LoopPhase::Idle,
                halted: false,
                polls: 0,
            }),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoopStatus> {
        self.status.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn halt(&self) {
        self.lock().halted = true;
        self.wake.notify_all();
    }

    fn is_halted(&self) -> bool {
        self.lock().halted
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.lock().phase = phase;
    }

    fn phase(&self) -> LoopPhase {
        self.lock().phase
    }

    fn finish_poll(&self) {
        self.lock().polls += 1;
    }

    fn polls(&self) -> u64 {
        self.lock().polls
    }

    /// Sleep for `duration` unless halted first. Returns true if halted.
    fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut status = self.lock();
        if !status.halted {
            status.phase = LoopPhase::Sleeping;
        }
        while !status.halted {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            status = match self.wake.wait_timeout(status, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        status.halted
    }
}

/// Polling directory watcher.
///
/// Owns the change detector and the listeners. Listeners are registered
/// before [`start`](Self::start), which moves the watcher onto its own
/// thread.
pub struct DirectoryWatcher {
    detector: ChangeDetector,
    listeners: ListenerSet,
    interval: Duration,
    signal: Arc<LoopSignal>,
    span: Span,
}

impl fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.detector.root())
            .field("interval", &self.interval)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Create a watcher over `directory`, which must exist.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        directory: impl AsRef<Path>,
        extension: &str,
    ) -> Result<Self> {
        let detector = ChangeDetector::new(fs, directory, extension)?;
        let span = info_span!("watcher", root = %detector.root().display());
        Ok(Self {
            detector,
            listeners: ListenerSet::new(),
            interval: poll_interval_from_secs(DEFAULT_POLL_INTERVAL_SECS),
            signal: Arc::new(LoopSignal::new()),
            span,
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set the poll interval in seconds; values under the floor are raised
    /// to [`MIN_POLL_INTERVAL`].
    pub fn set_interval(&mut self, secs: u64) {
        self.interval = poll_interval_from_secs(secs);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Canonical watched directory.
    pub fn directory(&self) -> &Path {
        self.detector.root()
    }

    pub fn extension(&self) -> &str {
        self.detector.extension()
    }

    pub fn add_listener(&mut self, listener: impl DirectoryListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Run a single poll on the calling thread, dispatching each event to
    /// every listener as it is detected. Returns the number of events.
    pub fn poll_once(&mut self) -> usize {
        let span = self.span.clone();
        let _enter = span.enter();

        let Self {
            detector,
            listeners,
            signal,
            ..
        } = self;

        signal.set_phase(LoopPhase::Scanning);
        let mut events = 0;
        detector.poll(&mut |event| {
            events += 1;
            signal.set_phase(LoopPhase::Dispatching);
            debug!(%event, "dispatching event");
            listeners.dispatch(&event);
            signal.set_phase(LoopPhase::Scanning);
        });
        signal.finish_poll();
        events
    }

    /// Move the watcher onto a dedicated thread and start polling.
    pub fn start(self) -> Result<WatcherHandle> {
        let signal = Arc::clone(&self.signal);
        let thread = thread::Builder::new()
            .name("dirpub-watch".to_string())
            .spawn(move || self.run())?;
        Ok(WatcherHandle {
            signal,
            thread: Some(thread),
        })
    }

    fn run(mut self) {
        let span = self.span.clone();
        let _enter = span.enter();

        let interval_ms = self.interval.as_millis() as u64;
        debug!(directory = ?self.directory(), interval_ms, "starting to watch directory");

        while !self.signal.is_halted() {
            let events = self.poll_once();
            trace!(events, "poll complete");

            trace!(interval_ms, "sleeping");
            if self.signal.sleep(self.interval) {
                break;
            }
        }

        self.signal.set_phase(LoopPhase::Halted);
        info!("stopped watching");
    }
}

/// Handle to a running watch thread.
///
/// Dropping the handle halts the loop without waiting for it.
#[derive(Debug)]
pub struct WatcherHandle {
    signal: Arc<LoopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Ask the loop to stop. A scan or dispatch in progress runs to
    /// completion; a sleep is cut short.
    pub fn halt(&self) {
        self.signal.halt();
    }

    pub fn phase(&self) -> LoopPhase {
        self.signal.phase()
    }

    /// Number of completed polls.
    pub fn polls(&self) -> u64 {
        self.signal.polls()
    }

    /// Halt and wait for the thread to exit.
    pub fn join(mut self) -> Result<()> {
        self.signal.halt();
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| anyhow!("watch thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.signal.halt();
    }
}
