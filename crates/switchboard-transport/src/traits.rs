//! Transport abstraction for Switchboard.
//!
//! The relay only ever does two things to a connection: ask whether it is
//! still open and hand it a text message. Everything else (accepting,
//! framing, detecting disconnects) belongs to the host transport.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::mpsc;

/// Disambiguates IDs generated within the same clock tick.
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a connection.
///
/// Only used for equality, set membership and logging. Never sent to peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a new connection ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();
        let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}_{:x}", timestamp, counter))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// A live connection as seen by the relay.
///
/// `send` must not block on the remote peer: implementations queue the
/// message and return immediately.
pub trait Peer: Send {
    /// Get the connection's unique identifier.
    fn id(&self) -> &ConnectionId;

    /// Check if the transport still considers the connection open.
    fn is_open(&self) -> bool;

    /// Queue a text message for delivery.
    fn send(&self, text: String) -> Result<(), TransportError>;
}

/// Open/closed flag shared between an [`Outbox`] and the task that owns
/// the underlying socket.
#[derive(Debug, Clone)]
pub struct OpenFlag(Arc<AtomicBool>);

impl OpenFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Check whether the connection is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the connection closed. Returns `true` if it was open.
    pub fn close(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// A [`Peer`] backed by an unbounded queue.
///
/// The receiving half is drained by whatever task writes to the socket.
#[derive(Debug, Clone)]
pub struct Outbox {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
    open: OpenFlag,
}

impl Outbox {
    /// Create an outbox and the receiver its messages arrive on.
    #[must_use]
    pub fn channel(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let outbox = Self {
            id,
            sender,
            open: OpenFlag::new(),
        };
        (outbox, receiver)
    }

    /// Get a handle to the shared open flag.
    #[must_use]
    pub fn open_flag(&self) -> OpenFlag {
        self.open.clone()
    }
}

impl Peer for Outbox {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_open(&self) -> bool {
        self.open.is_open() && !self.sender.is_closed()
    }

    fn send(&self, text: String) -> Result<(), TransportError> {
        if !self.open.is_open() {
            return Err(TransportError::ConnectionClosed);
        }
        self.sender
            .send(text)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_generation() {
        let id1 = ConnectionId::generate();
        let id2 = ConnectionId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("conn_"));
    }

    #[test]
    fn test_connection_id_from_string() {
        let id: ConnectionId = "test-id".into();
        assert_eq!(id.as_str(), "test-id");
        assert_eq!(id.to_string(), "test-id");
    }

    #[test]
    fn test_outbox_delivers_in_order() {
        let (outbox, mut rx) = Outbox::channel("conn-1".into());
        assert!(outbox.is_open());

        outbox.send("one".to_string()).unwrap();
        outbox.send("two".to_string()).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_outbox_closed_flag() {
        let (outbox, mut rx) = Outbox::channel("conn-1".into());
        let flag = outbox.open_flag();

        assert!(flag.close());
        assert!(!flag.close());
        assert!(!outbox.is_open());
        assert!(matches!(
            outbox.send("late".to_string()),
            Err(TransportError::ConnectionClosed)
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_outbox_receiver_dropped() {
        let (outbox, rx) = Outbox::channel("conn-1".into());
        drop(rx);

        assert!(!outbox.is_open());
        assert!(matches!(
            outbox.send("lost".to_string()),
            Err(TransportError::SendFailed(_))
        ));
    }
}
