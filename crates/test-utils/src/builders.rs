#![allow(dead_code)]

use std::path::Path;

use dirpub::config::RawConfigFile;

/// Builder for `RawConfigFile` to simplify test setup.
///
/// `RawConfigBuilder::complete()` starts from a config that validates.
#[derive(Debug, Clone, Default)]
pub struct RawConfigBuilder {
    config: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All required values filled in with a plain `tcp://` server.
    pub fn complete() -> Self {
        Self::new()
            .server("tcp://localhost:61613")
            .user("publisher")
            .password("secret")
            .queue("orders")
            .source("/srv/drop")
            .target("/srv/done")
    }

    pub fn server(mut self, server: &str) -> Self {
        self.config.queue.server = Some(server.to_string());
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.config.queue.user = Some(user.to_string());
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.config.queue.password = Some(password.to_string());
        self
    }

    pub fn queue(mut self, name: &str) -> Self {
        self.config.queue.name = Some(name.to_string());
        self
    }

    pub fn without_queue(mut self) -> Self {
        self.config.queue.name = None;
        self
    }

    pub fn source(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.watch.source = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn target(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.watch.target = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn extension(mut self, ext: &str) -> Self {
        self.config.watch.extension = Some(ext.to_string());
        self
    }

    pub fn headers(mut self, on: bool) -> Self {
        self.config.watch.headers = Some(on);
        self
    }

    pub fn interval(mut self, secs: u64) -> Self {
        self.config.watch.interval = Some(secs);
        self
    }

    /// Fill in all four TLS values.
    pub fn tls(mut self) -> Self {
        let tls = &mut self.config.queue.tls;
        tls.client_key = Some("client.p12".into());
        tls.ca_file = Some("ca.pem".into());
        tls.server_key = Some("server.pem".into());
        tls.passphrase = Some("changeit".into());
        self
    }

    /// Set only the CA file, leaving the other TLS values unset.
    pub fn ca_file(mut self, path: &str) -> Self {
        self.config.queue.tls.ca_file = Some(path.into());
        self
    }

    pub fn tls_without_passphrase(mut self) -> Self {
        self = self.tls();
        self.config.queue.tls.passphrase = None;
        self
    }

    pub fn build(self) -> RawConfigFile {
        self.config
    }
}
