use bytes::Bytes;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};

pub use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// A connected WebSocket to a device RPC endpoint.
pub type WsSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What an inbound WebSocket message means to the RPC layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A complete RPC frame (text or binary message body).
    Frame(Bytes),
    /// Ping/pong or raw frames; answered by the socket layer, nothing to route.
    Control,
    /// The device sent a close message.
    Close,
}

/// Dial the endpoint's `ws://<host>/rpc` URL.
pub async fn dial(endpoint: &Endpoint) -> Result<WsSocket> {
    let url = endpoint.url();
    debug!(%url, "dialing");

    let (socket, response) = connect_async(url.as_str())
        .await
        .map_err(|source| TransportError::Dial {
            url: url.clone(),
            source,
        })?;

    debug!(%url, status = %response.status(), "connected");
    Ok(socket)
}

/// Wrap an already-serialized outbound frame.
///
/// Frames go out as binary messages; devices answer with text.
pub fn frame_message(frame: Bytes) -> Message {
    Message::Binary(frame.to_vec())
}

/// Normal-closure message sent on shutdown.
pub fn close_message() -> Message {
    Message::Close(None)
}

/// Classify an inbound message.
pub fn classify(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Frame(Bytes::from(text)),
        Message::Binary(data) => Inbound::Frame(Bytes::from(data)),
        Message::Close(_) => Inbound::Close,
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Control,
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn classifies_text_and_binary_as_frames() {
        assert_eq!(
            classify(Message::Text("{\"id\":1}".to_string())),
            Inbound::Frame(Bytes::from_static(b"{\"id\":1}"))
        );
        assert_eq!(
            classify(Message::Binary(b"{\"id\":2}".to_vec())),
            Inbound::Frame(Bytes::from_static(b"{\"id\":2}"))
        );
    }

    #[test]
    fn classifies_control_and_close() {
        assert_eq!(classify(Message::Ping(vec![1])), Inbound::Control);
        assert_eq!(classify(Message::Pong(vec![])), Inbound::Control);
        assert_eq!(classify(close_message()), Inbound::Close);
    }

    #[test]
    fn outbound_frames_are_binary() {
        let msg = frame_message(Bytes::from_static(b"{}"));
        assert_eq!(msg, Message::Binary(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn dial_and_exchange_with_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let msg = ws.next().await.unwrap().unwrap();
            let Inbound::Frame(frame) = classify(msg) else {
                panic!("expected a frame");
            };
            ws.send(Message::Text(String::from_utf8(frame.to_vec()).unwrap()))
                .await
                .unwrap();
        });

        let endpoint = Endpoint::new(addr.to_string()).unwrap();
        let mut socket = dial(&endpoint).await.expect("dial should succeed");
        socket
            .send(frame_message(Bytes::from_static(b"{\"id\":7}")))
            .await
            .unwrap();

        let reply = socket.next().await.unwrap().unwrap();
        assert_eq!(
            classify(reply),
            Inbound::Frame(Bytes::from_static(b"{\"id\":7}"))
        );

        server.await.unwrap();
    }

    #[tokio::test]
    async fn dial_refused_reports_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::new(addr.to_string()).unwrap();
        let err = dial(&endpoint).await.unwrap_err();
        match err {
            TransportError::Dial { url, .. } => assert_eq!(url, endpoint.url()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
