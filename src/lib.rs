// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod processor;
pub mod sink;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::Settings;
use crate::fs::{FileSystem, RealFileSystem};
use crate::processor::FileProcessor;
use crate::sink::{QueueSink, StompSink};
use crate::watch::DirectoryWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - configuration (file + flags)
/// - the queue connection
/// - the watcher and the file processor listening to it
/// - Ctrl-C handling
///
/// Must be called from outside `runtime`'s worker threads; the queue sink
/// blocks on it.
pub fn run(args: CliArgs, runtime: Handle) -> Result<()> {
    let settings = config::resolve(&args).context("invalid configuration")?;

    if args.dry_run {
        print_dry_run(&settings);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let sink = Arc::new(StompSink::new(settings.queue.clone(), runtime.clone()));
    sink.connect()?;

    let mut watcher = DirectoryWatcher::new(
        Arc::clone(&fs),
        &settings.watch.source,
        &settings.watch.extension,
    )?;
    watcher.set_interval(settings.watch.interval_secs);

    let processor = FileProcessor::new(
        fs,
        Arc::clone(&sink),
        &settings.watch.source,
        &settings.watch.target,
        settings.watch.headers,
    )?;

    info!(
        directory = %watcher.directory().display(),
        extension = %watcher.extension(),
        interval_ms = watcher.interval().as_millis() as u64,
        "watching directory"
    );
    info!(
        target_dir = %processor.target().display(),
        headers = settings.watch.headers,
        "processed files are moved to target directory"
    );

    watcher.add_listener(processor);
    let handle = watcher.start()?;

    if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
        warn!(error = %e, "failed to listen for Ctrl+C, stopping");
    } else {
        info!("Ctrl+C received, shutting down");
    }

    handle.join()?;
    sink.close();
    Ok(())
}

fn print_dry_run(settings: &Settings) {
    let queue = &settings.queue;
    let watch = &settings.watch;

    println!("dirpub dry run");
    println!("  server:    {}", queue.address);
    println!("  user:      {}", queue.user);
    println!("  password:  <redacted>");
    println!("  queue:     {}", queue.name);
    if let Some(tls) = &queue.tls {
        println!("  tls:");
        println!("    client key: {}", tls.client_key.display());
        println!("    ca file:    {}", tls.ca_file.display());
        println!("    server key: {}", tls.server_key.display());
    }
    println!("  source:    {}", watch.source.display());
    println!("  target:    {}", watch.target.display());
    println!("  extension: {}", watch.extension);
    println!("  headers:   {}", watch.headers);
    println!(
        "  interval:  {} ms",
        crate::watch::poll_interval_from_secs(watch.interval_secs).as_millis()
    );
}
