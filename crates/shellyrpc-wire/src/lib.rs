//! Wire envelopes for the Shelly Gen2 RPC dialect.
//!
//! Every outbound frame is a JSON object:
//! `{"id": <int>, "method": "<Component>.<Action>", "params": {...}, "auth": {...}}`
//!
//! Every inbound frame carries the same `id`, the device `src`, and either a
//! `result` (method-specific, decoded by callers) or an `error`. Only the
//! envelope is decoded here; the `result` body stays raw.

pub mod auth;
pub mod code;
pub mod envelope;
pub mod error;

pub use auth::{AuthChallenge, AuthResponse, DIGEST_AUTH_TYPE, SHA256_ALGORITHM};
pub use code::{describe, RpcError, AUTH_REQUIRED};
pub use envelope::{decode_envelope, decode_result, Request, Response, ResultEnvelope};
pub use error::{Result, WireError};
