// src/config/mod.rs

//! Configuration for dirpub.
//!
//! Values come from an optional TOML file (`model.rs`, `loader.rs`) and the
//! command line. Flags win over the file. The merged result is validated
//! into [`Settings`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

use tracing::debug;

use crate::cli::CliArgs;
use crate::errors::Result;

pub use loader::{load_from_path, load_from_str};
pub use model::{
    QueueSection, QueueSettings, RawConfigFile, Settings, TlsSection, TlsSettings, WatchSection,
    WatchSettings,
};
pub use validate::{normalize_extension, validate_config, DEFAULT_EXTENSION};

/// Load `--config` (if given), apply command-line overrides and validate.
pub fn resolve(args: &CliArgs) -> Result<Settings> {
    let file = match &args.config {
        Some(path) => {
            debug!(config = ?path, "loading config file");
            load_from_path(path)?
        }
        None => RawConfigFile::default(),
    };
    validate_config(apply_cli(file, args))
}

/// Overlay the values given on the command line onto `file`.
pub fn apply_cli(mut file: RawConfigFile, args: &CliArgs) -> RawConfigFile {
    let queue = &mut file.queue;
    override_with(&mut queue.server, &args.server);
    override_with(&mut queue.user, &args.user);
    override_with(&mut queue.password, &args.pass);
    override_with(&mut queue.name, &args.queue);

    let tls = &mut queue.tls;
    override_with(&mut tls.client_key, &args.ssl_client_key);
    override_with(&mut tls.ca_file, &args.ssl_ca);
    override_with(&mut tls.server_key, &args.ssl_server_key);
    override_with(&mut tls.passphrase, &args.ssl_pass);

    let watch = &mut file.watch;
    override_with(&mut watch.source, &args.source);
    override_with(&mut watch.target, &args.target);
    override_with(&mut watch.extension, &args.extension);
    override_with(&mut watch.interval, &args.interval);
    // A bare flag can only switch header mode on.
    if args.headers {
        watch.headers = Some(true);
    }

    file
}

fn override_with<T: Clone>(slot: &mut Option<T>, cli: &Option<T>) {
    if let Some(value) = cli {
        *slot = Some(value.clone());
    }
}
