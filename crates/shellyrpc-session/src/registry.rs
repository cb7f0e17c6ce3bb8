use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use shellyrpc_wire::Response;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// A routed inbound frame: the decoded envelope plus the untouched bytes.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    pub response: Response,
    pub raw: Bytes,
}

/// Receiving side of a handle's single-slot delivery point.
pub type Inbox = mpsc::Receiver<InboundFrame>;

/// Outcome of routing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the registered handle.
    Delivered,
    /// No handle is registered under the id (typically a response that
    /// arrived after its caller gave up).
    Unknown,
    /// The handle already holds an undelivered frame.
    SlotFull,
}

/// Maps correlation ids to waiting handles.
///
/// The lock covers map mutation only. Delivery never waits on the receiving
/// caller: each slot buffers exactly one frame.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    slots: HashMap<u64, mpsc::Sender<InboundFrame>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and its delivery point.
    ///
    /// Ids increase monotonically from 1 for the life of the registry.
    pub fn register(&self) -> (u64, Inbox) {
        let (tx, rx) = mpsc::channel(1);
        let mut inner = self.lock();
        inner.last_id += 1;
        let id = inner.last_id;
        inner.slots.insert(id, tx);
        (id, rx)
    }

    /// Hand a frame to the handle registered under `id`.
    pub fn deliver(&self, id: u64, frame: InboundFrame) -> Delivery {
        let Some(slot) = self.lock().slots.get(&id).cloned() else {
            return Delivery::Unknown;
        };

        match slot.try_send(frame) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::SlotFull,
            Err(TrySendError::Closed(_)) => Delivery::Unknown,
        }
    }

    /// Remove `id`. Returns whether it was registered.
    pub fn deregister(&self, id: u64) -> bool {
        self.lock().slots.remove(&id).is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.lock().slots.contains_key(&id)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
