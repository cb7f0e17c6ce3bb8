use crate::ws::WsError;

/// Errors that can occur in WebSocket transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured host cannot be turned into an endpoint.
    #[error("invalid host '{0}'")]
    InvalidHost(String),

    /// Failed to establish the WebSocket connection.
    #[error("failed to connect to {url}: {source}")]
    Dial {
        url: String,
        #[source]
        source: WsError,
    },

    /// Writing a frame to the socket failed.
    #[error("socket write failed: {0}")]
    Write(#[source] WsError),

    /// Reading a frame from the socket failed.
    #[error("socket read failed: {0}")]
    Read(#[source] WsError),

    /// The device closed the connection.
    #[error("connection closed by device")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
