//! Routing output.
//!
//! Router operations never send anything themselves. They return a list of
//! [`Outbound`] envelopes which the relay then delivers.

use switchboard_protocol::ServerEnvelope;
use switchboard_transport::ConnectionId;

/// An envelope addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Target connection.
    pub target: ConnectionId,
    /// The envelope to deliver.
    pub envelope: ServerEnvelope,
}

impl Outbound {
    /// Create a new outbound envelope.
    #[must_use]
    pub fn new(target: impl Into<ConnectionId>, envelope: ServerEnvelope) -> Self {
        Self {
            target: target.into(),
            envelope,
        }
    }
}
