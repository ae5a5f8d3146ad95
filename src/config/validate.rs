// src/config/validate.rs

//! Turning a merged [`RawConfigFile`] into validated [`Settings`].
//!
//! This checks:
//! - every required value is present (the error names the flag to pass)
//! - the server address is `tcp://` or `ssl://` with a valid port
//! - a secure transport has all four TLS values
//!
//! It does **not** touch the filesystem; source and target directories are
//! checked when the watcher and processor are built.

use tracing::warn;

use crate::config::model::{
    QueueSettings, RawConfigFile, Settings, TlsSection, TlsSettings, WatchSettings,
};
use crate::errors::{DirpubError, Result};
use crate::types::ServerAddress;
use crate::watch::DEFAULT_POLL_INTERVAL_SECS;

pub const DEFAULT_EXTENSION: &str = ".xml";

impl TryFrom<RawConfigFile> for Settings {
    type Error = DirpubError;

    fn try_from(raw: RawConfigFile) -> Result<Self> {
        let queue = raw.queue;
        let watch = raw.watch;

        let server = required(queue.server, "queue server address", "--server", "[queue].server")?;
        let address: ServerAddress = server
            .parse()
            .map_err(DirpubError::ConfigError)?;

        let user = required(queue.user, "queue user", "--user", "[queue].user")?;
        let password = required(queue.password, "queue password", "--pass", "[queue].password")?;
        let name = required(queue.name, "queue name", "--queue", "[queue].name")?;
        let tls = validate_tls(&address, queue.tls)?;

        let source = required(watch.source, "source directory", "--source", "[watch].source")?;
        let target = required(watch.target, "target directory", "--target", "[watch].target")?;

        let extension =
            normalize_extension(watch.extension.as_deref().unwrap_or(DEFAULT_EXTENSION))?;

        Ok(Settings {
            queue: QueueSettings {
                address,
                user,
                password,
                name,
                tls,
            },
            watch: WatchSettings {
                source,
                target,
                extension,
                headers: watch.headers.unwrap_or(false),
                interval_secs: watch.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            },
        })
    }
}

/// Validate a raw config (already merged with CLI values).
pub fn validate_config(raw: RawConfigFile) -> Result<Settings> {
    Settings::try_from(raw)
}

/// Lowercase the extension and make sure it starts with a dot.
pub fn normalize_extension(ext: &str) -> Result<String> {
    let ext = ext.trim().to_lowercase();
    let ext = ext.strip_prefix('.').unwrap_or(&ext);
    if ext.is_empty() {
        return Err(DirpubError::ConfigError(
            "file extension must not be empty (--extension)".to_string(),
        ));
    }
    Ok(format!(".{ext}"))
}

fn required<T>(value: Option<T>, what: &str, flag: &str, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        DirpubError::ConfigError(format!("missing {what}: pass {flag} or set {key}"))
    })
}

/// A secure address needs all four TLS values. Any TLS value given at all
/// needs the other three too, whatever the scheme. A complete set for a
/// plain server is ignored with a warning.
fn validate_tls(address: &ServerAddress, tls: TlsSection) -> Result<Option<TlsSettings>> {
    let mut missing = Vec::new();
    if tls.client_key.is_none() {
        missing.push("--ssl-client-key");
    }
    if tls.ca_file.is_none() {
        missing.push("--ssl-ca");
    }
    if tls.server_key.is_none() {
        missing.push("--ssl-server-key");
    }
    if tls.passphrase.is_none() {
        missing.push("--ssl-pass");
    }

    if (address.is_secure() || !tls.is_empty()) && !missing.is_empty() {
        return Err(DirpubError::ConfigError(format!(
            "missing TLS option for server address {address}: {}",
            missing.join(", ")
        )));
    }

    if !address.is_secure() {
        if !tls.is_empty() {
            warn!(
                server = %address,
                "TLS options given for a non-secure server address, ignoring them"
            );
        }
        return Ok(None);
    }

    match (tls.client_key, tls.ca_file, tls.server_key, tls.passphrase) {
        (Some(client_key), Some(ca_file), Some(server_key), Some(passphrase)) => {
            Ok(Some(TlsSettings {
                client_key,
                ca_file,
                server_key,
                passphrase,
            }))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased_and_dotted() {
        assert_eq!(normalize_extension(".XML").unwrap(), ".xml");
        assert_eq!(normalize_extension("json").unwrap(), ".json");
        assert_eq!(normalize_extension(" .Txt ").unwrap(), ".txt");
        assert!(normalize_extension(".").is_err());
        assert!(normalize_extension("").is_err());
    }
}
