use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::AuthResponse;
use crate::code::RpcError;
use crate::error::{Result, WireError};

/// Outbound RPC request.
///
/// `id` and `auth` are filled in by the call handle on its own copy; callers
/// normally leave them unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Option<u64>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthResponse>,
}

impl Request {
    /// Create a request for `method` with no parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Attach serialized parameters.
    pub fn with_params<P: Serialize>(mut self, params: &P) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    /// Serialize to the outbound frame.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Inbound envelope: everything except the method-specific `result`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    /// The correlation identifier, required for routing.
    pub fn routing_id(&self) -> Result<u64> {
        self.id.ok_or(WireError::MissingId)
    }
}

/// Inbound envelope including a typed `result`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultEnvelope<T> {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub src: Option<String>,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// Decode just the response envelope of an inbound frame.
///
/// The `result` body is skipped without being interpreted.
pub fn decode_envelope(frame: &[u8]) -> Result<Response> {
    Ok(serde_json::from_slice(frame)?)
}

/// Decode an inbound frame with its `result` typed as `T`.
pub fn decode_result<T: DeserializeOwned>(frame: &[u8]) -> Result<ResultEnvelope<T>> {
    Ok(serde_json::from_slice(frame)?)
}
