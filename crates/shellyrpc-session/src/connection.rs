use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use shellyrpc_transport::{
    classify, close_message, dial, frame_message, Endpoint, Inbound, Message, TransportError,
    WsError, WsSocket,
};
use shellyrpc_wire::{decode_envelope, Request};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::auth::{AuthState, Negotiator};
use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::handle::CallHandle;
use crate::registry::{Delivery, InboundFrame, Registry};

type PumpResult = std::result::Result<(), TransportError>;

/// Something that hands out call handles over a shared transport.
pub trait HandleFactory {
    /// Register a new handle.
    fn new_handle(&self) -> CallHandle;

    /// Shut the transport down. Idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Point-in-time connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Frames written to the socket.
    pub frames_sent: u64,
    /// Frames read from the socket.
    pub frames_received: u64,
    /// Frames with no registered handle (late, duplicate, or unsolicited).
    pub unrouted: u64,
    /// Frames that could not be decoded.
    pub malformed: u64,
    /// Successful connections after the first.
    pub reconnects: u64,
    /// Whether a socket is currently up.
    pub connected: bool,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    unrouted: AtomicU64,
    malformed: AtomicU64,
    connects: AtomicU64,
    connected: AtomicBool,
}

/// State shared between the connection, its background task, and handles.
pub(crate) struct Shared {
    pub(crate) registry: Registry,
    pub(crate) negotiator: Negotiator,
    pub(crate) send_timeout: Duration,
    pub(crate) shutdown: CancellationToken,
    /// Cancelled once the background task has exited (or will never run).
    stopped: CancellationToken,
    endpoint: Endpoint,
    egress: mpsc::Sender<Bytes>,
    backoff: Duration,
    debug: bool,
    counters: Counters,
}

impl Shared {
    /// Queue a serialized frame for the writer.
    ///
    /// Waits for queue capacity, giving up on shutdown, caller cancellation,
    /// or `deadline`.
    pub(crate) async fn enqueue(
        &self,
        frame: Bytes,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(SessionError::ClosedByServer);
        }

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(SessionError::ClosedByServer),
            _ = cancel.cancelled() => Err(SessionError::ClosedByCaller),
            sent = self.egress.send(frame) => sent.map_err(|_| SessionError::ClosedByServer),
            _ = tokio::time::sleep_until(deadline) => Err(SessionError::Timeout(self.send_timeout)),
        }
    }

    fn route(&self, frame: Bytes) {
        self.counters.received.fetch_add(1, Ordering::Relaxed);
        if self.debug {
            debug!(frame = %String::from_utf8_lossy(&frame), "RX");
        }

        let response = match decode_envelope(&frame) {
            Ok(response) => response,
            Err(err) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "dropping malformed frame");
                return;
            }
        };

        let id = match response.routing_id() {
            Ok(id) => id,
            Err(err) => {
                self.counters.unrouted.fetch_add(1, Ordering::Relaxed);
                warn!(src = ?response.src, error = %err, "dropping unroutable frame");
                return;
            }
        };

        match self.registry.deliver(
            id,
            InboundFrame {
                response,
                raw: frame,
            },
        ) {
            Delivery::Delivered => trace!(id, "routed response"),
            Delivery::Unknown => {
                self.counters.unrouted.fetch_add(1, Ordering::Relaxed);
                debug!(id, "no handle registered for response; dropping");
            }
            Delivery::SlotFull => {
                self.counters.unrouted.fetch_add(1, Ordering::Relaxed);
                warn!(id, "handle already holds a response; dropping");
            }
        }
    }
}

/// One managed connection to a device.
///
/// A background task keeps a WebSocket to `ws://<host>/rpc` alive,
/// reconnecting after a fixed backoff whenever dialing or the socket fails.
/// Handles taken from the connection share the socket, the correlation
/// registry, and the cached auth credential.
pub struct Connection {
    shared: Arc<Shared>,
    egress_rx: Mutex<Option<mpsc::Receiver<Bytes>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Build a connection without starting it.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.validate()?;
        if config.password().is_none() {
            debug!(host = %endpoint.host(), "password is not set");
        }

        let (egress, egress_rx) = mpsc::channel(config.egress_capacity);
        let shared = Shared {
            registry: Registry::new(),
            negotiator: Negotiator::from_config(config),
            send_timeout: config.effective_send_timeout(),
            shutdown: CancellationToken::new(),
            stopped: CancellationToken::new(),
            endpoint,
            egress,
            backoff: config.reconnect_backoff,
            debug: config.debug,
            counters: Counters::default(),
        };

        Ok(Self {
            shared: Arc::new(shared),
            egress_rx: Mutex::new(Some(egress_rx)),
            supervisor: Mutex::new(None),
        })
    }

    /// Build and start a connection.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let connection = Self::new(config)?;
        connection.start();
        Ok(connection)
    }

    /// Launch the reconnect loop. Returns `false` if it was already started
    /// or the connection is closed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let Some(egress) = lock(&self.egress_rx).take() else {
            return false;
        };
        if self.shared.shutdown.is_cancelled() {
            self.shared.stopped.cancel();
            return false;
        }

        let task = tokio::spawn(supervise(Arc::clone(&self.shared), egress));
        *lock(&self.supervisor) = Some(task);
        true
    }

    /// Register a new call handle on this connection.
    pub fn new_handle(&self) -> CallHandle {
        CallHandle::new(Arc::clone(&self.shared))
    }

    /// Send one request on a fresh handle and return the raw response.
    pub async fn call(&self, request: &Request) -> Result<Bytes> {
        let mut handle = self.new_handle();
        handle.send(request).await
    }

    /// Like [`Connection::call`], aborting with
    /// [`SessionError::ClosedByCaller`] once `cancel` fires.
    pub async fn call_with_cancel(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let mut handle = self.new_handle();
        handle.send_with_cancel(request, cancel).await
    }

    /// Stop the reconnect loop, wait for it to exit, and release the queue.
    ///
    /// Waiting calls fail with [`SessionError::ClosedByServer`], as does every
    /// later call. Idempotent; concurrent callers all wait for the exit.
    pub async fn close(&self) {
        self.shared.shutdown.cancel();

        let never_started = lock(&self.egress_rx).take().is_some();
        if never_started {
            self.shared.stopped.cancel();
        }

        let task = lock(&self.supervisor).take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!(error = %err, "connection task ended abnormally");
            }
        }
        self.shared.stopped.cancelled().await;
        debug!(url = %self.shared.endpoint, "connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.shutdown.is_cancelled()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// True once a credential is cached and attached to requests.
    pub fn is_auth_enabled(&self) -> bool {
        self.shared.negotiator.current().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        self.shared.negotiator.state()
    }

    /// Number of challenge rounds answered on this connection.
    pub fn auth_rounds(&self) -> u64 {
        self.shared.negotiator.rounds()
    }

    /// Handles currently registered.
    pub fn pending_calls(&self) -> usize {
        self.shared.registry.len()
    }

    pub fn stats(&self) -> ConnectionStats {
        let counters = &self.shared.counters;
        ConnectionStats {
            frames_sent: counters.sent.load(Ordering::Relaxed),
            frames_received: counters.received.load(Ordering::Relaxed),
            unrouted: counters.unrouted.load(Ordering::Relaxed),
            malformed: counters.malformed.load(Ordering::Relaxed),
            reconnects: counters.connects.load(Ordering::Relaxed).saturating_sub(1),
            connected: counters.connected.load(Ordering::Relaxed),
        }
    }
}

impl HandleFactory for Connection {
    fn new_handle(&self) -> CallHandle {
        Connection::new_handle(self)
    }

    fn close(&self) -> impl Future<Output = ()> + Send {
        Connection::close(self)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.shared.endpoint.url())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}

async fn supervise(shared: Arc<Shared>, mut egress: mpsc::Receiver<Bytes>) {
    let _stopped = shared.stopped.clone().drop_guard();
    let url = shared.endpoint.url();

    loop {
        debug!(%url, "connecting");
        let dialed = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            dialed = dial(&shared.endpoint) => dialed,
        };

        match dialed {
            Ok(socket) => {
                shared.counters.connects.fetch_add(1, Ordering::Relaxed);
                shared.counters.connected.store(true, Ordering::Relaxed);
                shared.negotiator.reset();

                let outcome = pump(&shared, socket, &mut egress).await;
                shared.counters.connected.store(false, Ordering::Relaxed);

                match outcome {
                    Ok(()) => break,
                    Err(err) => {
                        warn!(%url, error = %err, retry_in = ?shared.backoff, "connection lost")
                    }
                }
            }
            Err(err) => warn!(%url, error = %err, retry_in = ?shared.backoff, "connect failed"),
        }

        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            _ = tokio::time::sleep(shared.backoff) => {}
        }
    }

    debug!(%url, "connection task stopped");
}

/// Run the reader and writer over one socket until either fails or shutdown.
///
/// `Ok` means shutdown; any error means the socket is gone.
async fn pump(shared: &Shared, socket: WsSocket, egress: &mut mpsc::Receiver<Bytes>) -> PumpResult {
    let (sink, stream) = socket.split();

    tokio::select! {
        read = ingress(shared, stream) => read,
        written = drain_egress(shared, sink, egress) => written,
    }
}

async fn ingress<S>(shared: &Shared, mut stream: S) -> PumpResult
where
    S: Stream<Item = std::result::Result<Message, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match classify(message.map_err(TransportError::Read)?) {
            Inbound::Frame(frame) => shared.route(frame),
            Inbound::Control => {}
            Inbound::Close => return Err(TransportError::Closed),
        }
    }
    Err(TransportError::Closed)
}

async fn drain_egress<K>(
    shared: &Shared,
    mut sink: K,
    egress: &mut mpsc::Receiver<Bytes>,
) -> PumpResult
where
    K: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => {
                if let Err(err) = sink.send(close_message()).await {
                    debug!(error = %err, "close message not delivered");
                }
                return Ok(());
            }
            next = egress.recv() => {
                let Some(frame) = next else {
                    return Ok(());
                };
                if shared.debug {
                    debug!(frame = %String::from_utf8_lossy(&frame), "TX");
                }
                sink.send(frame_message(frame))
                    .await
                    .map_err(TransportError::Write)?;
                shared.counters.sent.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
