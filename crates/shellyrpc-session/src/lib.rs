//! Connection management for Shelly Gen2 RPC.
//!
//! This is the "just works" layer. Open one [`Connection`] per device; it
//! keeps a WebSocket alive in the background, reconnecting as needed. Each
//! caller takes a [`CallHandle`] from it and sends requests; responses are
//! correlated back by id, and a digest challenge from the device is answered
//! once and reused by every later call on the same connection.

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod handle;
pub mod registry;

#[cfg(test)]
mod mock;

pub use auth::{digest_response, AuthState, Credentials, Negotiator};
pub use config::{
    ClientConfig, DEFAULT_EGRESS_CAPACITY, DEFAULT_RECONNECT_BACKOFF, DEFAULT_SEND_TIMEOUT,
    DEFAULT_USERNAME,
};
pub use connection::{Connection, ConnectionStats, HandleFactory};
pub use error::{AuthError, Result, SessionError};
pub use handle::CallHandle;
pub use registry::{Delivery, InboundFrame, Inbox, Registry};
