// src/config/model.rs

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::ServerAddress;

/// Optional configuration file as read from TOML.
///
/// ```toml
/// [queue]
/// server = "tcp://192.168.56.202:61613"
/// user = "publisher"
/// password = "secret"
/// name = "orders.inbound"
///
/// [queue.tls]
/// client_key = "client.p12"
/// ca_file = "ca.pem"
/// server_key = "server.pem"
/// passphrase = "changeit"
///
/// [watch]
/// source = "/srv/drop"
/// target = "/srv/done"
/// extension = ".xml"
/// headers = true
/// interval = 5
/// ```
///
/// Every field is optional here; command-line flags fill in or override
/// values before validation turns this into [`Settings`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[queue]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub tls: TlsSection,
}

/// `[queue.tls]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    pub client_key: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
    pub server_key: Option<PathBuf>,
    pub passphrase: Option<String>,
}

impl TlsSection {
    pub fn is_empty(&self) -> bool {
        self.client_key.is_none()
            && self.ca_file.is_none()
            && self.server_key.is_none()
            && self.passphrase.is_none()
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub extension: Option<String>,
    pub headers: Option<bool>,
    /// Poll interval in seconds.
    pub interval: Option<u64>,
}

/// Validated settings the runtime is built from.
#[derive(Debug, Clone)]
pub struct Settings {
    pub queue: QueueSettings,
    pub watch: WatchSettings,
}

#[derive(Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub address: ServerAddress,
    pub user: String,
    pub password: String,
    pub name: String,
    /// Present only for `ssl://` addresses.
    pub tls: Option<TlsSettings>,
}

impl fmt::Debug for QueueSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSettings")
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("tls", &self.tls)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TlsSettings {
    pub client_key: PathBuf,
    pub ca_file: PathBuf,
    pub server_key: PathBuf,
    pub passphrase: String,
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("client_key", &self.client_key)
            .field("ca_file", &self.ca_file)
            .field("server_key", &self.server_key)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Lowercase, leading dot included.
    pub extension: String,
    pub headers: bool,
    pub interval_secs: u64,
}
