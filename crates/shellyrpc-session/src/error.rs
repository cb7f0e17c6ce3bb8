use std::time::Duration;

use shellyrpc_wire::RpcError;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] shellyrpc_transport::TransportError),

    /// Envelope encoding/decoding error.
    #[error("wire error: {0}")]
    Wire(#[from] shellyrpc_wire::WireError),

    /// No response arrived within the send timeout.
    #[error("timeout waiting for response after {0:?}")]
    Timeout(Duration),

    /// The connection shut down while the call was waiting.
    #[error("channel closed by server")]
    ClosedByServer,

    /// The caller cancelled the call or closed its handle.
    #[error("channel closed by client")]
    ClosedByCaller,

    /// Authentication could not be completed.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// The device answered with an error other than an auth challenge.
    #[error("{0}")]
    Remote(RpcError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A successful response carried no `result`.
    #[error("result is missing from response")]
    MissingResult,
}

/// Reasons a digest challenge could not be satisfied.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No username or password is configured locally.
    #[error("{0} is required")]
    MissingCredentials(&'static str),

    /// The challenge could not be parsed.
    #[error("invalid challenge: {0}")]
    InvalidChallenge(#[from] shellyrpc_wire::WireError),

    /// The challenge asks for a digest algorithm we do not implement.
    #[error("unsupported digest algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    /// The device challenged again after the credential was attached.
    #[error("credentials rejected by device")]
    Rejected,
}

pub type Result<T> = std::result::Result<T, SessionError>;
