use std::fmt;

use serde::{Deserialize, Serialize};

/// The device requires (or rejected) digest authentication.
pub const AUTH_REQUIRED: i64 = 401;
pub const INVALID_ARGUMENT: i64 = -103;
pub const DEADLINE_EXCEEDED: i64 = -104;
pub const NOT_FOUND: i64 = -105;
pub const RESOURCE_EXHAUSTED: i64 = -108;
pub const FAILED_PRECONDITION: i64 = -109;
pub const UNAVAILABLE: i64 = -114;
pub const NOT_IMPLEMENTED: i64 = 404;

/// Error object returned by a device in place of a `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when `message` holds a digest challenge.
    pub fn is_auth_challenge(&self) -> bool {
        self.code == AUTH_REQUIRED
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match describe(self.code) {
            Some(description) => write!(
                f,
                "status {}: err {}; {}",
                self.code, self.message, description
            ),
            None => write!(f, "status {}: err {}", self.code, self.message),
        }
    }
}

impl std::error::Error for RpcError {}

/// Human description of a documented device error code.
pub fn describe(code: i64) -> Option<&'static str> {
    let text = match code {
        INVALID_ARGUMENT => {
            "parameters sent in the request do not match the ones specified by the method"
        }
        DEADLINE_EXCEEDED => "request timeout",
        NOT_FOUND => "instance with specified ID not found",
        RESOURCE_EXHAUSTED => "resource has reached its limit",
        FAILED_PRECONDITION => "precondition for the requested action is not satisfied",
        UNAVAILABLE => "service is unavailable",
        NOT_IMPLEMENTED => "method is not implemented on this device or caller is not authorized",
        AUTH_REQUIRED => "authentication required",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_appends_known_description() {
        let err = RpcError::new(NOT_FOUND, "No such component");
        assert_eq!(
            err.to_string(),
            "status -105: err No such component; instance with specified ID not found"
        );
    }

    #[test]
    fn display_unknown_code_is_verbatim() {
        let err = RpcError::new(-1, "boom");
        assert_eq!(err.to_string(), "status -1: err boom");
    }

    #[test]
    fn only_401_is_a_challenge() {
        assert!(RpcError::new(401, "{}").is_auth_challenge());
        assert!(!RpcError::new(404, "").is_auth_challenge());
    }

    #[test]
    fn message_defaults_when_absent() {
        let err: RpcError = serde_json::from_str(r#"{"code":-114}"#).unwrap();
        assert_eq!(err, RpcError::new(UNAVAILABLE, ""));
    }
}
