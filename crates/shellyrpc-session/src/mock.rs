//! Scripted stand-in for a device, used by the session tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ClientConfig;

/// What the device does with one request.
pub(crate) enum Reply {
    Send(String),
    After(Duration, String),
    Many(Vec<String>),
    Silent,
    /// Drop the socket without a close frame.
    Hangup,
}

type Script = dyn Fn(&Value) -> Reply + Send + Sync;

pub(crate) struct MockDevice {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    accept: JoinHandle<()>,
}

impl MockDevice {
    pub(crate) async fn start<F>(script: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock device should bind");
        let addr = listener.local_addr().expect("bound listener has an address");
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script: Arc<Script> = Arc::new(script);

        let accept = {
            let connections = Arc::clone(&connections);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(tcp, Arc::clone(&script), Arc::clone(&requests)));
                }
            })
        };

        Self {
            addr,
            connections,
            requests,
            accept,
        }
    }

    /// Client config pointed at this device with test-sized timings.
    pub(crate) fn config(&self) -> ClientConfig {
        ClientConfig {
            send_timeout: Some(Duration::from_secs(2)),
            reconnect_backoff: Duration::from_millis(50),
            ..ClientConfig::new(self.addr.to_string())
        }
    }

    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Raw text of every request received, in arrival order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_values(&self) -> Vec<Value> {
        self.requests()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn serve(tcp: TcpStream, script: Arc<Script>, requests: Arc<Mutex<Vec<String>>>) {
    let Ok(ws) = tokio_tungstenite::accept_async(tcp).await else {
        return;
    };
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
            Message::Close(_) => break,
            _ => continue,
        };
        requests.lock().unwrap().push(text.clone());

        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        match script(&value) {
            Reply::Send(frame) => {
                let _ = tx.send(frame);
            }
            Reply::After(delay, frame) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(frame);
                });
            }
            Reply::Many(frames) => {
                for frame in frames {
                    let _ = tx.send(frame);
                }
            }
            Reply::Silent => {}
            Reply::Hangup => break,
        }
    }

    writer.abort();
}

pub(crate) fn result_frame(id: &Value, result: Value) -> String {
    json!({ "id": id, "src": "mock-device", "result": result }).to_string()
}

pub(crate) fn error_frame(id: &Value, code: i64, message: &str) -> String {
    json!({
        "id": id,
        "src": "mock-device",
        "error": { "code": code, "message": message },
    })
    .to_string()
}

pub(crate) fn challenge_frame(id: &Value, realm: &str, nonce: u64) -> String {
    let challenge = json!({
        "auth_type": "digest",
        "nonce": nonce,
        "nc": 1,
        "realm": realm,
        "algorithm": "SHA-256",
    });
    error_frame(id, 401, &challenge.to_string())
}
