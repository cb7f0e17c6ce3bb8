//! WebSocket RPC client for Shelly Gen2 devices.
//!
//! One [`Client`] per device keeps a single socket to `ws://<host>/rpc` open,
//! correlates concurrent calls by id, and answers digest auth challenges
//! transparently.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoint addressing and WebSocket dialing
//! - [`wire`]: request/response envelopes, device error codes, auth payloads
//! - [`session`]: connection manager, call handles, correlation, digest auth
//!
//! ```no_run
//! # async fn demo() -> shellyrpc::session::Result<()> {
//! use shellyrpc::{Client, ClientConfig};
//!
//! let config = ClientConfig {
//!     password: Some("secret".to_string()),
//!     ..ClientConfig::new("192.168.1.40")
//! };
//! let client = Client::connect(&config)?;
//! let info = client.device_info().await?;
//! println!("{} running {:?}", info.id, info.version);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod types;

pub use client::Client;
pub use shellyrpc_session::{ClientConfig, SessionError};
pub use types::{DeviceInfo, MethodList};

/// Re-export transport types.
pub mod transport {
    pub use shellyrpc_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use shellyrpc_wire::*;
}

/// Re-export session types.
pub mod session {
    pub use shellyrpc_session::*;
}
