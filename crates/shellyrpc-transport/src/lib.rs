//! WebSocket transport for Shelly Gen2 RPC endpoints.
//!
//! This is the lowest layer of shellyrpc. It knows how to turn a device host
//! into the fixed `ws://<host>/rpc` endpoint, dial it, and convert between
//! raw frame bytes and WebSocket messages. Everything else builds on top of
//! the [`WsSocket`] type provided here.

pub mod endpoint;
pub mod error;
pub mod ws;

pub use endpoint::{Endpoint, RPC_PATH, WS_SCHEME};
pub use error::{Result, TransportError};
pub use ws::{classify, close_message, dial, frame_message, Inbound, Message, WsError, WsSocket};
