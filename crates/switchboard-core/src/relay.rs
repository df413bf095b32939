//! Connection lifecycle management.
//!
//! [`Relay`] turns transport events into router operations and delivers the
//! resulting envelopes. It owns every open [`Peer`] handle: once a
//! connection's `Closed` event is processed its handle is dropped, so no
//! later delivery can reach it.

use crate::message::Outbound;
use crate::router::Router;
use bytes::Bytes;
use std::collections::HashMap;
use switchboard_protocol::{codec, Decoded, Request, ServerEnvelope};
use switchboard_transport::{ConnectionId, Peer};
use tracing::{debug, error, info, trace, warn};

/// A transport event.
#[derive(Debug)]
pub enum Event<P> {
    /// A connection was accepted.
    Opened(P),
    /// A raw message arrived on a connection.
    Received(ConnectionId, Bytes),
    /// The transport closed a connection.
    Closed(ConnectionId),
}

/// What handling one event produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Envelopes handed to a peer.
    pub delivered: usize,
    /// Envelopes dropped because the target was closed, gone or refused them.
    pub skipped: usize,
    /// Bytes handed to peers.
    pub bytes_out: usize,
    /// The inbound message could not be parsed.
    pub malformed: bool,
}

/// The connection lifecycle manager.
///
/// All methods take `&mut self`; wrap the relay in a single lock (or own it
/// from a single task) so events from different connections are applied
/// one at a time.
#[derive(Debug)]
pub struct Relay<P> {
    router: Router,
    peers: HashMap<ConnectionId, P>,
}

impl<P: Peer> Relay<P> {
    /// Create a relay with an empty channel table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            peers: HashMap::new(),
        }
    }

    /// Get the channel table.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Get the number of open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Check if a connection is registered.
    #[must_use]
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.peers.contains_key(id)
    }

    /// Apply one transport event.
    pub fn handle(&mut self, event: Event<P>) -> Report {
        match event {
            Event::Opened(peer) => self.on_open(peer),
            Event::Received(id, raw) => self.on_message(&id, &raw),
            Event::Closed(id) => self.on_close(&id),
        }
    }

    /// Register a connection and greet it.
    pub fn on_open(&mut self, peer: P) -> Report {
        let id = peer.id().clone();
        info!(connection = %id, "New client connected");

        if self.peers.insert(id.clone(), peer).is_some() {
            warn!(connection = %id, "Connection opened twice, replacing handle");
        }

        self.deliver(vec![Outbound::new(id, ServerEnvelope::welcome())])
    }

    /// Decode a raw message and dispatch it to the router.
    ///
    /// Malformed input is logged and dropped; the connection stays open and
    /// gets no reply. Kinds other than `join` and `message` are ignored.
    pub fn on_message(&mut self, id: &ConnectionId, raw: &[u8]) -> Report {
        if !self.peers.contains_key(id) {
            warn!(connection = %id, "Message from unknown connection dropped");
            return Report::default();
        }

        let request = match codec::decode(raw) {
            Ok(Decoded::Request(request)) => request,
            Ok(Decoded::Ignored(kind)) => {
                debug!(
                    connection = %id,
                    kind = kind.as_deref().unwrap_or("N/A"),
                    "Ignoring envelope"
                );
                return Report::default();
            }
            Err(e) => {
                error!(connection = %id, error = %e, "Error handling message");
                return Report {
                    malformed: true,
                    ..Report::default()
                };
            }
        };

        debug!(
            connection = %id,
            kind = %request.kind(),
            channel = request.channel().unwrap_or("N/A"),
            "Received"
        );

        let peers = &self.peers;
        let is_open = |member: &ConnectionId| peers.get(member).is_some_and(|p| p.is_open());

        let outbound = match request {
            Request::Join {
                channel,
                id: request_id,
            } => self
                .router
                .join(id, channel.as_deref(), request_id, is_open),
            Request::Message { channel, message } => {
                self.router
                    .publish(id, channel.as_deref(), message, is_open)
            }
        };

        self.deliver(outbound)
    }

    /// Forget a connection and remove it from every channel.
    ///
    /// Safe to call more than once for the same connection.
    pub fn on_close(&mut self, id: &ConnectionId) -> Report {
        let known = self.peers.remove(id).is_some();
        let left = self.router.disconnect(id);

        if known {
            info!(connection = %id, channels = left, "Client disconnected");
        } else {
            debug!(connection = %id, "Close for unknown connection");
        }

        Report::default()
    }

    /// Hand each envelope to its target. A missing, closed or failing target
    /// is skipped without affecting the others.
    fn deliver(&self, outbound: Vec<Outbound>) -> Report {
        let mut report = Report::default();

        for Outbound { target, envelope } in outbound {
            let Some(peer) = self.peers.get(&target).filter(|p| p.is_open()) else {
                trace!(connection = %target, "Skipping closed connection");
                report.skipped += 1;
                continue;
            };

            let text = match codec::encode(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    error!(connection = %target, error = %e, "Failed to encode envelope");
                    report.skipped += 1;
                    continue;
                }
            };

            let len = text.len();
            match peer.send(text) {
                Ok(()) => {
                    report.delivered += 1;
                    report.bytes_out += len;
                }
                Err(e) => {
                    debug!(connection = %target, error = %e, "Send failed");
                    report.skipped += 1;
                }
            }
        }

        report
    }
}

impl<P: Peer> Default for Relay<P> {
    fn default() -> Self {
        Self::new()
    }
}
