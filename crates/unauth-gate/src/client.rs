//! Client identity derived from the transport-level remote address.

use std::fmt;
use std::net::SocketAddr;

use thiserror::Error;

/// Reasons a remote address could not be split into host and port.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("address {0}: missing port in address")]
    MissingPort(String),
    #[error("address {0}: too many colons in address")]
    TooManyColons(String),
    #[error("address {0}: missing ']' in address")]
    MissingBracket(String),
    #[error("address {0}: unexpected '{1}' in address")]
    Unexpected(String, char),
}

/// Counting key for a remote address with no recoverable host.
pub const UNKNOWN_HOST: &str = "unknown";

/// Remote client as seen by the gate. The host is the counting key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientAddr {
    host: String,
    port: Result<String, AddrError>,
}

impl ClientAddr {
    /// Parse a `host:port` / `[v6]:port` string.
    ///
    /// Never fails: when the address cannot be split the key falls back to the
    /// raw address (brackets trimmed) and the port slot carries the error. An
    /// empty host is keyed as [`UNKNOWN_HOST`].
    pub fn parse(remote: &str) -> Self {
        match split_host_port(remote) {
            Ok((host, port)) => Self {
                host: host_key(host),
                port: Ok(port.to_string()),
            },
            Err(err) => Self {
                host: host_key(remote.trim_start_matches('[').trim_end_matches(']')),
                port: Err(err),
            },
        }
    }

    pub fn from_socket(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: Ok(addr.port().to_string()),
        }
    }

    /// Counting key for the attempt store.
    pub fn key(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Result<&str, &AddrError> {
        self.port.as_deref()
    }

    /// Port, or the split error when there is none, for diagnostics.
    pub fn port_display(&self) -> PortDisplay<'_> {
        PortDisplay(&self.port)
    }
}

fn host_key(host: &str) -> String {
    let host = host.trim();
    if host.is_empty() {
        UNKNOWN_HOST.to_string()
    } else {
        host.to_string()
    }
}

impl From<SocketAddr> for ClientAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::from_socket(addr)
    }
}

pub struct PortDisplay<'a>(&'a Result<String, AddrError>);

impl fmt::Display for PortDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Ok(port) => f.write_str(port),
            Err(err) => write!(f, "{err}"),
        }
    }
}

/// Split `host:port`, `[host]:port` or `[host%zone]:port`.
pub fn split_host_port(addr: &str) -> Result<(&str, &str), AddrError> {
    let colon = addr
        .rfind(':')
        .ok_or_else(|| AddrError::MissingPort(addr.to_string()))?;

    let (host, open, close) = if addr.starts_with('[') {
        let end = addr
            .find(']')
            .ok_or_else(|| AddrError::MissingBracket(addr.to_string()))?;
        if end + 1 == addr.len() {
            return Err(AddrError::MissingPort(addr.to_string()));
        }
        if end + 1 != colon {
            if addr.as_bytes()[end + 1] == b':' {
                return Err(AddrError::TooManyColons(addr.to_string()));
            }
            return Err(AddrError::MissingPort(addr.to_string()));
        }
        (&addr[1..end], 1, end + 1)
    } else {
        let host = &addr[..colon];
        if host.contains(':') {
            return Err(AddrError::TooManyColons(addr.to_string()));
        }
        (host, 0, 0)
    };

    if addr[open..].contains('[') {
        return Err(AddrError::Unexpected(addr.to_string(), '['));
    }
    if addr[close..].contains(']') {
        return Err(AddrError::Unexpected(addr.to_string(), ']'));
    }

    Ok((host, &addr[colon + 1..]))
}
