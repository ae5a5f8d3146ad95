// src/watch/mod.rs

//! Polling-based change detection.
//!
//! This module is responsible for:
//! - Selecting the files in scope (`filter`).
//! - Comparing the tree against recorded modification times (`detector`).
//! - Running the scan / dispatch / sleep loop on its own thread (`watcher`).
//! - The event type and listener seam consumers plug into (`event`).
//!
//! It does **not** know what happens to a file once an event is delivered;
//! that is the job of the listeners (see [`crate::processor`]).

pub mod detector;
pub mod event;
pub mod filter;
pub mod path_utils;
pub mod watcher;

pub use detector::ChangeDetector;
pub use event::{DirectoryListener, FileEvent, ListenerSet};
pub use filter::ExtensionFilter;
pub use watcher::{
    poll_interval_from_secs, DirectoryWatcher, LoopPhase, WatcherHandle,
    DEFAULT_POLL_INTERVAL_SECS, MIN_POLL_INTERVAL,
};
