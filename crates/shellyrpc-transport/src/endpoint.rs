use std::fmt;

use crate::error::{Result, TransportError};

/// WebSocket scheme used by Gen2 devices on the local network.
pub const WS_SCHEME: &str = "ws";
/// Fixed path of the RPC channel.
pub const RPC_PATH: &str = "/rpc";

const MAX_HOST_LEN: usize = 253 + 6;

/// A validated device endpoint (`host` or `host:port`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
}

impl Endpoint {
    /// Validate a host and build the endpoint for it.
    ///
    /// The host must be non-empty and must not carry a scheme or a path; those
    /// are fixed by the protocol.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let host = host.into();
        let trimmed = host.trim();

        if trimmed.is_empty() || trimmed.len() > MAX_HOST_LEN {
            return Err(TransportError::InvalidHost(host));
        }
        if trimmed.contains("://")
            || trimmed.contains('/')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(TransportError::InvalidHost(host));
        }

        Ok(Self {
            host: trimmed.to_string(),
        })
    }

    /// The host (and optional port) this endpoint points at.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The full RPC URL, e.g. `ws://192.168.1.20/rpc`.
    pub fn url(&self) -> String {
        format!("{WS_SCHEME}://{}{RPC_PATH}", self.host)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_rpc_url() {
        let endpoint = Endpoint::new("192.168.1.20").unwrap();
        assert_eq!(endpoint.host(), "192.168.1.20");
        assert_eq!(endpoint.url(), "ws://192.168.1.20/rpc");
    }

    #[test]
    fn keeps_port_and_trims_whitespace() {
        let endpoint = Endpoint::new("  shellyplus1-abc.local:8080 ").unwrap();
        assert_eq!(endpoint.url(), "ws://shellyplus1-abc.local:8080/rpc");
        assert_eq!(endpoint.to_string(), endpoint.url());
    }

    #[test]
    fn rejects_empty_host() {
        assert!(matches!(
            Endpoint::new(""),
            Err(TransportError::InvalidHost(_))
        ));
        assert!(matches!(
            Endpoint::new("   "),
            Err(TransportError::InvalidHost(_))
        ));
    }

    #[test]
    fn rejects_scheme_and_path() {
        assert!(Endpoint::new("ws://10.0.0.2").is_err());
        assert!(Endpoint::new("10.0.0.2/rpc").is_err());
        assert!(Endpoint::new("10.0.0 .2").is_err());
    }
}
