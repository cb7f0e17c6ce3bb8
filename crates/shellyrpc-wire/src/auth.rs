use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};

/// `auth_type` announced by devices for digest authentication.
pub const DIGEST_AUTH_TYPE: &str = "digest";
/// The only digest algorithm Gen2 devices use.
pub const SHA256_ALGORITHM: &str = "SHA-256";

/// Digest challenge embedded (as JSON text) in the message of a 401 error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
    pub realm: String,
    pub nonce: u64,
    /// Nonce count; devices send 1 and it defaults to 1 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nc: Option<u64>,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

fn default_algorithm() -> String {
    SHA256_ALGORITHM.to_string()
}

impl AuthChallenge {
    /// Parse the challenge out of a 401 error message.
    pub fn parse(message: &str) -> Result<Self> {
        let challenge: Self = serde_json::from_str(message)
            .map_err(|err| WireError::InvalidChallenge(err.to_string()))?;

        if challenge.realm.is_empty() {
            return Err(WireError::InvalidChallenge("empty realm".to_string()));
        }
        if let Some(auth_type) = &challenge.auth_type {
            if auth_type != DIGEST_AUTH_TYPE {
                return Err(WireError::InvalidChallenge(format!(
                    "unsupported auth_type '{auth_type}'"
                )));
            }
        }

        Ok(challenge)
    }

    /// Nonce count to hash with.
    pub fn nonce_count(&self) -> u64 {
        self.nc.unwrap_or(1)
    }
}

/// Credential attached to requests once a challenge has been answered.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub realm: String,
    pub username: String,
    pub nonce: u64,
    pub cnonce: u64,
    pub response: String,
    pub algorithm: String,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("realm", &self.realm)
            .field("username", &self.username)
            .field("nonce", &self.nonce)
            .field("cnonce", &self.cnonce)
            .field(
                "response",
                &format_args!("<redacted:{} chars>", self.response.len()),
            )
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
