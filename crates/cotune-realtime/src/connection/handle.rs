//! Individual WebSocket connection handle.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use cotune_core::message::ServerMessage;
use cotune_core::types::{ConnectionId, Identity};

/// A handle to a single live transport.
///
/// Holds the sender for pushing frames to the client plus the identity the
/// handshake bound to it. Dropping the receiver side (the socket writer
/// task) makes every later send a no-op.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Identity supplied by the handshake
    pub identity: Identity,
    sender: mpsc::Sender<ServerMessage>,
    last_pong: Mutex<Instant>,
    alive: AtomicBool,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(identity: Identity, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            sender,
            last_pong: Mutex::new(Instant::now()),
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        }
    }

    /// Queue a frame for this connection without waiting.
    ///
    /// Delivery is at-most-once: a full queue drops the frame, a closed
    /// queue marks the connection dead.
    pub fn send(&self, msg: ServerMessage) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    kind = msg.kind(),
                    "Connection send buffer full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead and wake whoever waits on [`Self::closed`].
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.closed.cancel();
    }

    /// Resolves once the connection has been marked dead.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Record a pong response
    pub fn record_pong(&self) {
        let mut last = self.last_pong.lock().unwrap_or_else(|e| e.into_inner());
        *last = Instant::now();
    }

    /// Time of the last pong (or of connect, before the first one).
    pub fn last_pong(&self) -> Instant {
        *self.last_pong.lock().unwrap_or_else(|e| e.into_inner())
    }
}
