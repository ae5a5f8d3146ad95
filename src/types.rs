// src/types.rs

//! Shared value types.

use std::fmt;
use std::str::FromStr;

/// Default STOMP port used when the server address omits one.
pub const DEFAULT_PORT: u16 = 61613;

/// Transport scheme of a queue server address.
///
/// - `Tcp`: plain connection (`tcp://host:port`).
/// - `Ssl`: secure transport (`ssl://host:port`); requires the full set of
///   TLS credentials at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Tcp,
    Ssl,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "ssl" => Ok(Transport::Ssl),
            other => Err(format!(
                "invalid transport scheme: {other} (expected \"tcp\" or \"ssl\")"
            )),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("tcp"),
            Transport::Ssl => f.write_str("ssl"),
        }
    }
}

/// Parsed queue server address, e.g. `tcp://192.168.56.202:61613`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn is_secure(&self) -> bool {
        self.transport == Transport::Ssl
    }

    /// `host:port`, suitable for a socket connect.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| format!("server address {s:?} has no scheme (expected tcp:// or ssl://)"))?;
        let transport = Transport::from_str(scheme)?;

        let rest = rest.trim_end_matches('/');
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port {port:?} in server address {s:?}"))?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(format!("server address {s:?} has no host"));
        }

        Ok(ServerAddress {
            transport,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.transport, self.host, self.port)
    }
}
