// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `dirpub`.
///
/// Every queue and watch option can also come from the `--config` file;
/// values given here take precedence.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "dirpub",
    version,
    about = "Publish files dropped into a directory to a message queue.",
    long_about = None
)]
pub struct CliArgs {
    /// Queue server address, e.g. `tcp://192.168.56.202:61613` or `ssl://host:port`.
    #[arg(short = 's', long, value_name = "URL")]
    pub server: Option<String>,

    /// User to authenticate with.
    #[arg(short = 'u', long, value_name = "USER")]
    pub user: Option<String>,

    /// Password to authenticate with.
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub pass: Option<String>,

    /// Destination queue name.
    #[arg(short = 'q', long, value_name = "NAME")]
    pub queue: Option<String>,

    /// Directory to watch for new files.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory processed files are moved into.
    #[arg(short = 't', long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Extension of the files to publish. Default: `.xml`.
    #[arg(short = 'e', long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Read `Name: Value` header lines from the top of each file.
    #[arg(short = 'H', long)]
    pub headers: bool,

    /// Poll interval in seconds (minimum 2). Default: 5.
    #[arg(short = 'i', long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// CA certificate file for `ssl://` servers.
    #[arg(long, value_name = "PATH")]
    pub ssl_ca: Option<PathBuf>,

    /// Server key file for `ssl://` servers.
    #[arg(long, value_name = "PATH")]
    pub ssl_server_key: Option<PathBuf>,

    /// Client key file for `ssl://` servers.
    #[arg(long, value_name = "PATH")]
    pub ssl_client_key: Option<PathBuf>,

    /// Passphrase of the client key.
    #[arg(long, value_name = "PASSPHRASE")]
    pub ssl_pass: Option<String>,

    /// Optional config file (TOML).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIRPUB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the configuration and print it, without connecting or watching.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn short_flags_parse() {
        let args = CliArgs::try_parse_from([
            "dirpub", "-s", "tcp://localhost:61613", "-u", "me", "-p", "pw", "-q", "orders",
            "-d", "/in", "-t", "/out", "-e", ".json", "-H", "-i", "10",
        ])
        .unwrap();
        assert_eq!(args.server.as_deref(), Some("tcp://localhost:61613"));
        assert_eq!(args.queue.as_deref(), Some("orders"));
        assert_eq!(args.source, Some(PathBuf::from("/in")));
        assert_eq!(args.extension.as_deref(), Some(".json"));
        assert!(args.headers);
        assert_eq!(args.interval, Some(10));
        assert!(!args.dry_run);
    }
}
