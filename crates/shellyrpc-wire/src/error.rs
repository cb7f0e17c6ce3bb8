/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame is not a valid envelope.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An inbound frame without a correlation identifier.
    #[error("frame has no id")]
    MissingId,

    /// The 401 error message does not carry a usable challenge.
    #[error("invalid auth challenge: {0}")]
    InvalidChallenge(String),
}

pub type Result<T> = std::result::Result<T, WireError>;
