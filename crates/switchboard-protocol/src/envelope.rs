//! Envelope types for the Switchboard protocol.
//!
//! Every WebSocket text message carries exactly one JSON envelope tagged by
//! its `type` field. Clients send [`Request`]s; the relay answers with
//! [`ServerEnvelope`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Welcome text sent to every freshly opened connection.
pub const WELCOME: &str = "Please join a channel to start chatting";

/// Notice sent to existing members when someone joins their channel.
pub const PEER_JOINED: &str = "A new user has joined the channel";

/// Envelope kind identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Join,
    Message,
    System,
    Error,
    Broadcast,
}

impl Kind {
    /// The value carried in the `type` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Join => "join",
            Kind::Message => "message",
            Kind::System => "system",
            Kind::Error => "error",
            Kind::Broadcast => "broadcast",
        }
    }
}

impl TryFrom<&str> for Kind {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, &'static str> {
        match value {
            "join" => Ok(Kind::Join),
            "message" => Ok(Kind::Message),
            "system" => Ok(Kind::System),
            "error" => Ok(Kind::Error),
            "broadcast" => Ok(Kind::Broadcast),
            _ => Err("Unknown envelope kind"),
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client request.
///
/// `channel` is `None` when the field was missing or not a string; the
/// router rejects such requests with an error envelope. `id` and `message`
/// distinguish an absent field (`None`) from an explicit `null`
/// (`Some(Value::Null)`) so either is echoed back exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Request {
    /// Join a channel.
    Join {
        /// Channel name.
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        /// Optional request ID echoed in the join result.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },

    /// Send an application message to the other members of a channel.
    Message {
        /// Target channel.
        #[serde(skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
        /// Opaque payload.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },
}

impl Request {
    /// Get the request kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Request::Join { .. } => Kind::Join,
            Request::Message { .. } => Kind::Message,
        }
    }

    /// Get the channel name, if one was supplied.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        match self {
            Request::Join { channel, .. } | Request::Message { channel, .. } => channel.as_deref(),
        }
    }

    /// Create a join request.
    #[must_use]
    pub fn join(channel: impl Into<String>, id: Option<Value>) -> Self {
        Request::Join {
            channel: Some(channel.into()),
            id,
        }
    }

    /// Create a message request.
    #[must_use]
    pub fn message(channel: impl Into<String>, message: impl Into<Value>) -> Self {
        Request::Message {
            channel: Some(channel.into()),
            message: Some(message.into()),
        }
    }
}

/// Who a broadcast came from. The relay never reveals sender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Peer,
}

/// Payload of a `system` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemMessage {
    /// Human-readable notice.
    Text(String),
    /// Request/result echo of a join.
    Reply {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        result: String,
    },
}

/// An envelope sent by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEnvelope {
    /// Welcome, join confirmations and peer notices.
    System {
        message: SystemMessage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },

    /// Validation or authorization failure for the preceding request.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },

    /// Fan-out of another member's message.
    Broadcast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
        sender: Sender,
        channel: String,
    },
}

impl ServerEnvelope {
    /// Get the envelope kind.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            ServerEnvelope::System { .. } => Kind::System,
            ServerEnvelope::Error { .. } => Kind::Error,
            ServerEnvelope::Broadcast { .. } => Kind::Broadcast,
        }
    }

    /// The greeting sent when a connection opens.
    #[must_use]
    pub fn welcome() -> Self {
        ServerEnvelope::System {
            message: SystemMessage::Text(WELCOME.to_string()),
            channel: None,
        }
    }

    /// First join confirmation.
    #[must_use]
    pub fn joined(channel: &str) -> Self {
        ServerEnvelope::System {
            message: SystemMessage::Text(format!("Joined channel: {channel}")),
            channel: Some(channel.to_string()),
        }
    }

    /// Second join confirmation, echoing the request ID.
    #[must_use]
    pub fn join_result(channel: &str, id: Option<Value>) -> Self {
        ServerEnvelope::System {
            message: SystemMessage::Reply {
                id,
                result: format!("Connected to channel: {channel}"),
            },
            channel: Some(channel.to_string()),
        }
    }

    /// Notice to existing members that someone joined.
    #[must_use]
    pub fn peer_joined(channel: &str) -> Self {
        ServerEnvelope::System {
            message: SystemMessage::Text(PEER_JOINED.to_string()),
            channel: Some(channel.to_string()),
        }
    }

    /// Create an error envelope.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        ServerEnvelope::Error {
            message: message.into(),
            channel: None,
        }
    }

    /// Create a broadcast envelope.
    #[must_use]
    pub fn broadcast(channel: &str, message: Option<Value>) -> Self {
        ServerEnvelope::Broadcast {
            message,
            sender: Sender::Peer,
            channel: channel.to_string(),
        }
    }
}
