//! WebSocket transport adapter.
//!
//! Splits an upgraded axum socket into an [`Outbox`] (the write side, owned
//! by the relay) and an [`Inbound`] stream (the read side, owned by the
//! connection task).

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::traits::{ConnectionId, OpenFlag, Outbox, TransportError};

/// Accept an upgraded socket under a freshly generated connection ID.
///
/// Spawns the writer task, so this must be called from within a tokio
/// runtime.
#[must_use]
pub fn accept(socket: WebSocket) -> (Outbox, Inbound) {
    accept_with_id(socket, ConnectionId::generate())
}

/// Accept an upgraded socket under the given connection ID.
#[must_use]
pub fn accept_with_id(socket: WebSocket, id: ConnectionId) -> (Outbox, Inbound) {
    let (sink, stream) = socket.split();
    let (outbox, receiver) = Outbox::channel(id.clone());
    let open = outbox.open_flag();

    tokio::spawn(write_loop(sink, receiver, open.clone(), id.clone()));

    let inbound = Inbound { id, stream, open };
    (outbox, inbound)
}

/// Drain queued messages into the socket until every outbox handle is
/// dropped or a write fails.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut receiver: mpsc::UnboundedReceiver<String>,
    open: OpenFlag,
    id: ConnectionId,
) {
    while let Some(text) = receiver.recv().await {
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!(connection = %id, error = %e, "WebSocket write failed");
            open.close();
            break;
        }
    }

    if let Err(e) = sink.close().await {
        trace!(connection = %id, error = %e, "WebSocket close failed");
    }
    debug!(connection = %id, "Writer finished");
}

/// Read side of a WebSocket connection.
pub struct Inbound {
    id: ConnectionId,
    stream: SplitStream<WebSocket>,
    open: OpenFlag,
}

impl Inbound {
    /// Get the connection's unique identifier.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Receive the next application payload.
    ///
    /// Text and binary messages are both returned as raw bytes. Returns
    /// `None` once the peer has closed the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying socket fails.
    pub async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Bytes::from(text))),
                Some(Ok(Message::Binary(data))) => return Ok(Some(Bytes::from(data))),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Pongs are answered by the protocol layer
                }
                Some(Ok(Message::Close(_))) => {
                    debug!(connection = %self.id, "Received close frame");
                    self.open.close();
                    return Ok(None);
                }
                Some(Err(e)) => {
                    warn!(connection = %self.id, error = %e, "WebSocket error");
                    self.open.close();
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!(connection = %self.id, "WebSocket stream ended");
                    self.open.close();
                    return Ok(None);
                }
            }
        }
    }

    /// Check if the connection is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.is_open()
    }
}

impl Drop for Inbound {
    fn drop(&mut self) {
        self.open.close();
    }
}
