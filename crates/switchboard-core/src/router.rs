//! Channel router for Switchboard.
//!
//! The router owns the channel table and implements join, publish and
//! disconnect. It is a plain state machine: every operation takes `&self`
//! or `&mut self`, returns the envelopes to deliver and never performs I/O.
//! Callers serialize access (see [`crate::relay::Relay`]).

use crate::channel::{validate_channel_name, Channel, ChannelId};
use crate::message::Outbound;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use switchboard_protocol::ServerEnvelope;
use switchboard_transport::ConnectionId;
use thiserror::Error;
use tracing::{debug, info};

/// Router errors.
///
/// The display strings are sent verbatim to the offending connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Channel name missing, empty or not a string.
    #[error("Channel name is required")]
    ChannelRequired,

    /// Publish to a channel the connection has not joined.
    #[error("You must join the channel first")]
    NotMember,
}

/// The channel table.
#[derive(Debug, Default)]
pub struct Router {
    /// Channels indexed by name. Entries are created on first join and kept
    /// after their last member leaves.
    channels: HashMap<ChannelId, Channel>,
    /// Connection memberships (connection -> joined channel names).
    memberships: HashMap<ConnectionId, HashSet<ChannelId>>,
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get router statistics.
    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            channel_count: self.channels.len(),
            connection_count: self.memberships.len(),
            total_memberships: self.memberships.values().map(HashSet::len).sum(),
        }
    }

    /// Add a connection to a channel, creating the channel if needed.
    ///
    /// Returns, in order, the two join confirmations for `conn` followed by
    /// a notice for every other open member. Joining a channel twice keeps a
    /// single membership but produces the full sequence again.
    pub fn join<F>(
        &mut self,
        conn: &ConnectionId,
        channel: Option<&str>,
        id: Option<Value>,
        is_open: F,
    ) -> Vec<Outbound>
    where
        F: Fn(&ConnectionId) -> bool,
    {
        let name = match validate_channel_name(channel) {
            Ok(name) => name,
            Err(e) => {
                debug!(connection = %conn, "Join without channel name");
                return vec![reject(conn, e)];
            }
        };

        let entry = self.channels.entry(name.to_string()).or_insert_with(|| {
            debug!(channel = %name, "Creating new channel");
            Channel::new(name)
        });
        entry.insert(conn.clone());
        self.memberships
            .entry(conn.clone())
            .or_default()
            .insert(name.to_string());

        info!(
            channel = %name,
            connection = %conn,
            members = entry.member_count(),
            "Client joined channel"
        );

        let mut outbound = vec![
            Outbound::new(conn.clone(), ServerEnvelope::joined(name)),
            Outbound::new(conn.clone(), ServerEnvelope::join_result(name, id)),
        ];
        outbound.extend(
            entry
                .others(conn)
                .filter(|&member| is_open(member))
                .map(|member| Outbound::new(member.clone(), ServerEnvelope::peer_joined(name))),
        );
        outbound
    }

    /// Fan a message out to every other open member of a channel.
    ///
    /// The sender gets nothing back on success, and exactly one error
    /// envelope if the channel name is invalid or it is not a member.
    pub fn publish<F>(
        &self,
        conn: &ConnectionId,
        channel: Option<&str>,
        message: Option<Value>,
        is_open: F,
    ) -> Vec<Outbound>
    where
        F: Fn(&ConnectionId) -> bool,
    {
        let name = match validate_channel_name(channel) {
            Ok(name) => name,
            Err(e) => {
                debug!(connection = %conn, "Publish without channel name");
                return vec![reject(conn, e)];
            }
        };

        let Some(entry) = self.channels.get(name).filter(|c| c.is_member(conn)) else {
            debug!(channel = %name, connection = %conn, "Publish from non-member");
            return vec![reject(conn, RouterError::NotMember)];
        };

        let envelope = ServerEnvelope::broadcast(name, message);
        let outbound: Vec<Outbound> = entry
            .others(conn)
            .filter(|&member| is_open(member))
            .map(|member| Outbound::new(member.clone(), envelope.clone()))
            .collect();

        if outbound.is_empty() {
            debug!(channel = %name, "No other clients in channel to receive message");
        } else {
            debug!(channel = %name, recipients = outbound.len(), "Broadcast to peers");
        }

        outbound
    }

    /// Remove a connection from every channel it joined.
    ///
    /// Idempotent. Returns the number of channels the connection left.
    pub fn disconnect(&mut self, conn: &ConnectionId) -> usize {
        let Some(joined) = self.memberships.remove(conn) else {
            return 0;
        };

        for name in &joined {
            if let Some(channel) = self.channels.get_mut(name) {
                if channel.remove(conn) {
                    info!(
                        channel = %name,
                        connection = %conn,
                        remaining = channel.member_count(),
                        "Client left channel"
                    );
                }
            }
        }

        joined.len()
    }

    /// Check if a channel exists.
    #[must_use]
    pub fn channel_exists(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Get the member count for a channel.
    #[must_use]
    pub fn member_count(&self, name: &str) -> usize {
        self.channels
            .get(name)
            .map(Channel::member_count)
            .unwrap_or(0)
    }

    /// Check if a connection is a member of a channel.
    #[must_use]
    pub fn is_member(&self, conn: &ConnectionId, name: &str) -> bool {
        self.channels
            .get(name)
            .is_some_and(|channel| channel.is_member(conn))
    }

    /// Get all channel names.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Get the channels a connection has joined.
    #[must_use]
    pub fn connection_channels(&self, conn: &ConnectionId) -> Vec<String> {
        self.memberships
            .get(conn)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn reject(conn: &ConnectionId, error: RouterError) -> Outbound {
    Outbound::new(conn.clone(), ServerEnvelope::error(error.to_string()))
}

/// Router statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    /// Number of channel entries, including empty ones.
    pub channel_count: usize,
    /// Number of connections that are a member of at least one channel.
    pub connection_count: usize,
    /// Total number of memberships.
    pub total_memberships: usize,
}
