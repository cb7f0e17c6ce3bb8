use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shellyrpc_session::{ClientConfig, Connection, ConnectionStats, Result, SessionError};
use shellyrpc_wire::{decode_result, Request};

use crate::types::{DeviceInfo, MethodList};

/// Typed client for one device.
#[derive(Debug)]
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Open a managed connection to the configured device.
    ///
    /// Returns as soon as the background connection task is running; the
    /// socket itself comes up asynchronously. Must be called from within a
    /// Tokio runtime.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            connection: Connection::open(config)?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Call `method` and return the raw response frame.
    pub async fn call_raw(&self, method: &str, params: Option<Value>) -> Result<Bytes> {
        let request = Request {
            params,
            ..Request::new(method)
        };
        self.connection.call(&request).await
    }

    /// Call `method` and decode its `result` as `T`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Option<Value>) -> Result<T> {
        let frame = self.call_raw(method, params).await?;
        let envelope = decode_result::<T>(&frame)?;
        if let Some(err) = envelope.error {
            return Err(SessionError::Remote(err));
        }
        envelope.result.ok_or(SessionError::MissingResult)
    }

    pub async fn device_info(&self) -> Result<DeviceInfo> {
        self.call("Shelly.GetDeviceInfo", None).await
    }

    /// Methods the current user may call, after ACL and auth filtering.
    pub async fn list_methods(&self) -> Result<MethodList> {
        self.call("Shelly.ListMethods", None).await
    }

    /// Whether requests currently carry a cached digest credential.
    pub fn is_auth_enabled(&self) -> bool {
        self.connection.is_auth_enabled()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.connection.stats()
    }

    pub async fn close(&self) {
        self.connection.close().await;
    }
}
