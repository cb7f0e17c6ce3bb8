use std::fmt;
use std::time::Duration;

use shellyrpc_transport::Endpoint;

use crate::error::{Result, SessionError};

/// Username devices accept for digest auth.
pub const DEFAULT_USERNAME: &str = "admin";
/// Per-call wait before a send gives up.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);
/// Wait between failed connection attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(3);
/// Outbound frames buffered before senders have to wait.
pub const DEFAULT_EGRESS_CAPACITY: usize = 50;

/// Configuration for one device connection.
#[derive(Clone)]
pub struct ClientConfig {
    /// Device host, optionally with `:port`. Required.
    pub host: String,
    /// Digest auth username.
    pub username: String,
    /// Digest auth password. Empty counts as unset.
    /// Never logged.
    pub password: Option<String>,
    /// Per-call timeout; `None` or zero means [`DEFAULT_SEND_TIMEOUT`].
    pub send_timeout: Option<Duration>,
    /// Wait between connection attempts.
    pub reconnect_backoff: Duration,
    /// Capacity of the shared outbound queue.
    pub egress_capacity: usize,
    /// Log raw TX/RX frames at debug level.
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: DEFAULT_USERNAME.to_string(),
            password: None,
            send_timeout: None,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            egress_capacity: DEFAULT_EGRESS_CAPACITY,
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Default configuration for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// The timeout actually applied to each call.
    pub fn effective_send_timeout(&self) -> Duration {
        match self.send_timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_SEND_TIMEOUT,
        }
    }

    /// The password, if one is set and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Check the configuration and resolve the endpoint.
    pub fn validate(&self) -> Result<Endpoint> {
        if self.host.trim().is_empty() {
            return Err(SessionError::InvalidConfig("host is required".to_string()));
        }
        if self.egress_capacity == 0 {
            return Err(SessionError::InvalidConfig(
                "egress_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(Endpoint::new(self.host.as_str())?)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ClientConfig");
        dbg.field("host", &self.host).field("username", &self.username);
        if let Some(password) = &self.password {
            dbg.field(
                "password",
                &format_args!("<redacted:{} bytes>", password.len()),
            );
        } else {
            dbg.field("password", &Option::<String>::None);
        }
        dbg.field("send_timeout", &self.send_timeout)
            .field("reconnect_backoff", &self.reconnect_backoff)
            .field("egress_capacity", &self.egress_capacity)
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("10.0.0.5");
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert_eq!(config.effective_send_timeout(), DEFAULT_SEND_TIMEOUT);
        assert_eq!(config.reconnect_backoff, DEFAULT_RECONNECT_BACKOFF);
        assert_eq!(config.egress_capacity, DEFAULT_EGRESS_CAPACITY);
        assert!(config.password().is_none());
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = ClientConfig {
            send_timeout: Some(Duration::ZERO),
            ..ClientConfig::new("10.0.0.5")
        };
        assert_eq!(config.effective_send_timeout(), DEFAULT_SEND_TIMEOUT);

        let config = ClientConfig {
            send_timeout: Some(Duration::from_millis(250)),
            ..ClientConfig::new("10.0.0.5")
        };
        assert_eq!(config.effective_send_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn empty_password_is_unset() {
        let config = ClientConfig {
            password: Some(String::new()),
            ..ClientConfig::new("10.0.0.5")
        };
        assert!(config.password().is_none());
    }

    #[test]
    fn validate_requires_host() {
        assert!(matches!(
            ClientConfig::default().validate(),
            Err(SessionError::InvalidConfig(_))
        ));
        assert!(matches!(
            ClientConfig::new("bad/host").validate(),
            Err(SessionError::Transport(_))
        ));

        let endpoint = ClientConfig::new("10.0.0.5:8080").validate().unwrap();
        assert_eq!(endpoint.url(), "ws://10.0.0.5:8080/rpc");
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = ClientConfig {
            egress_capacity: 0,
            ..ClientConfig::new("10.0.0.5")
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let config = ClientConfig {
            password: Some("hunter2".to_string()),
            ..ClientConfig::new("10.0.0.5")
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted:7 bytes>"));
    }
}
