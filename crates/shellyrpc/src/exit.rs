use std::fmt;
use std::io;

use shellyrpc::session::SessionError;
use shellyrpc::transport::TransportError;
use shellyrpc::wire::code::{DEADLINE_EXCEEDED, NOT_FOUND};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    let code = match &err {
        SessionError::InvalidConfig(_) | SessionError::Transport(TransportError::InvalidHost(_)) => {
            USAGE
        }
        SessionError::Transport(_) => TRANSPORT_ERROR,
        SessionError::Timeout(_) => TIMEOUT,
        SessionError::Authentication(_) => PERMISSION_DENIED,
        SessionError::Remote(remote) if remote.code == DEADLINE_EXCEEDED => TIMEOUT,
        SessionError::Remote(remote) if remote.code == NOT_FOUND => DATA_INVALID,
        SessionError::Wire(_) | SessionError::Json(_) | SessionError::MissingResult => DATA_INVALID,
        SessionError::Remote(_) | SessionError::ClosedByServer | SessionError::ClosedByCaller => {
            FAILURE
        }
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use shellyrpc::session::AuthError;
    use shellyrpc::wire::RpcError;

    use super::*;

    #[test]
    fn session_errors_map_to_exit_codes() {
        let cases = [
            (SessionError::InvalidConfig("host is required".into()), USAGE),
            (SessionError::Timeout(Duration::from_secs(1)), TIMEOUT),
            (SessionError::Authentication(AuthError::Rejected), PERMISSION_DENIED),
            (SessionError::Remote(RpcError::new(-104, "deadline")), TIMEOUT),
            (SessionError::Remote(RpcError::new(-103, "bad arg")), FAILURE),
            (SessionError::MissingResult, DATA_INVALID),
            (SessionError::ClosedByServer, FAILURE),
        ];
        for (err, code) in cases {
            assert_eq!(session_error("call failed", err).code, code);
        }
    }

    #[test]
    fn context_prefixes_message() {
        let err = session_error("Switch.Set failed", SessionError::ClosedByCaller);
        assert_eq!(err.to_string(), "Switch.Set failed: channel closed by client");
    }
}
