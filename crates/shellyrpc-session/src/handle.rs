use std::sync::Arc;

use bytes::Bytes;
use shellyrpc_wire::{AuthResponse, Request};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::Shared;
use crate::error::{AuthError, Result, SessionError};
use crate::registry::{InboundFrame, Inbox};

/// A caller's view of a connection.
///
/// Each handle owns one correlation id and receives only frames carrying
/// it. A handle runs one call at a time; take several handles for
/// concurrent calls. Dropping the handle deregisters it.
pub struct CallHandle {
    id: u64,
    inbox: Inbox,
    shared: Arc<Shared>,
    closed: bool,
}

impl CallHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        let (id, inbox) = shared.registry.register();
        Self {
            id,
            inbox,
            shared,
            closed: false,
        }
    }

    /// Correlation id stamped on the next request.
    ///
    /// A send that ends without a response retires the id and the handle
    /// registers a fresh one.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send a request and wait for its response.
    ///
    /// Returns the raw response frame when it carries no error. A 401
    /// challenge is answered once with the configured credentials and the
    /// request is resent; any other device error is returned as
    /// [`SessionError::Remote`].
    pub async fn send(&mut self, request: &Request) -> Result<Bytes> {
        let cancel = CancellationToken::new();
        self.send_with_cancel(request, &cancel).await
    }

    /// Like [`CallHandle::send`], giving up with
    /// [`SessionError::ClosedByCaller`] once `cancel` fires.
    pub async fn send_with_cancel(
        &mut self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        if self.closed {
            return Err(SessionError::ClosedByCaller);
        }

        let (_, first) = self.exchange(request, cancel).await?;
        let challenge = match first.response.error {
            None => return Ok(first.raw),
            Some(err) if err.is_auth_challenge() => err,
            Some(err) => return Err(SessionError::Remote(err)),
        };

        debug!(id = self.id, method = %request.method, "device requires authentication");
        self.shared.negotiator.answer(&challenge.message)?;

        let (sent, second) = self.exchange(request, cancel).await?;
        match second.response.error {
            None => Ok(second.raw),
            Some(err) if err.is_auth_challenge() => {
                debug!(id = self.id, "credential rejected after challenge");
                if let Some(sent) = &sent {
                    self.shared.negotiator.reset_if_current(sent);
                }
                Err(AuthError::Rejected.into())
            }
            Some(err) => Err(SessionError::Remote(err)),
        }
    }

    /// Deregister the handle. Later sends fail with
    /// [`SessionError::ClosedByCaller`]. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shared.registry.deregister(self.id);
        self.inbox.close();
    }

    /// Stamp, enqueue, and wait for one matching frame.
    ///
    /// Returns the credential the request carried along with the frame.
    async fn exchange(
        &mut self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<(Option<AuthResponse>, InboundFrame)> {
        let deadline = Instant::now() + self.shared.send_timeout;

        let mut outbound = request.clone();
        outbound.id = Some(self.id);
        outbound.auth = self.shared.negotiator.current();
        if outbound.auth.is_some() {
            debug!(id = self.id, "attaching cached credential");
        }
        let frame = outbound.encode()?;
        let sent = outbound.auth;

        while let Ok(stale) = self.inbox.try_recv() {
            debug!(id = self.id, src = ?stale.response.src, "discarding stale response");
        }

        self.shared.enqueue(frame, cancel, deadline).await?;

        let received = tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => Err(SessionError::ClosedByServer),
            _ = cancel.cancelled() => Err(SessionError::ClosedByCaller),
            frame = self.inbox.recv() => frame.ok_or(SessionError::ClosedByServer),
            _ = tokio::time::sleep_until(deadline) => {
                debug!(id = self.id, method = %request.method, "timed out waiting for response");
                Err(SessionError::Timeout(self.shared.send_timeout))
            }
        };

        // The request is on the wire with no answer yet; its id must not
        // carry the next call.
        if received.is_err() {
            self.renew();
        }
        received.map(|frame| (sent, frame))
    }

    fn renew(&mut self) {
        self.shared.registry.deregister(self.id);
        let (id, inbox) = self.shared.registry.register();
        debug!(retired = self.id, id, "renewed handle id");
        self.id = id;
        self.inbox = inbox;
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish()
    }
}
