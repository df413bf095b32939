//! Channel abstraction for Switchboard.
//!
//! A channel is a named set of member connections. Names are arbitrary
//! non-empty strings, case-sensitive and never normalized.

use crate::router::RouterError;
use std::collections::HashSet;
use switchboard_transport::ConnectionId;
use tracing::debug;

/// A channel identifier.
pub type ChannelId = String;

/// Validate a channel name taken from a request.
///
/// # Errors
///
/// Returns [`RouterError::ChannelRequired`] if the name is missing or empty.
pub fn validate_channel_name(name: Option<&str>) -> Result<&str, RouterError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(RouterError::ChannelRequired),
    }
}

/// A channel and its current members.
#[derive(Debug)]
pub struct Channel {
    /// Channel name.
    name: ChannelId,
    /// Member connections.
    members: HashSet<ConnectionId>,
}

impl Channel {
    /// Create a new, empty channel.
    #[must_use]
    pub fn new(name: impl Into<ChannelId>) -> Self {
        Self {
            name: name.into(),
            members: HashSet::new(),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check if a connection is a member.
    #[must_use]
    pub fn is_member(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains(connection_id)
    }

    /// Add a member.
    ///
    /// Returns `true` if the connection was not already a member.
    pub fn insert(&mut self, connection_id: ConnectionId) -> bool {
        let inserted = self.members.insert(connection_id);
        if inserted {
            debug!(channel = %self.name, members = self.members.len(), "Member added");
        }
        inserted
    }

    /// Remove a member.
    ///
    /// Returns `true` if the connection was a member.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> bool {
        self.members.remove(connection_id)
    }

    /// Iterate over every member except `exclude`.
    pub fn others<'a>(
        &'a self,
        exclude: &'a ConnectionId,
    ) -> impl Iterator<Item = &'a ConnectionId> + 'a {
        self.members.iter().filter(move |member| *member != exclude)
    }

    /// Check if the channel has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_creation() {
        let channel = Channel::new("room1");
        assert_eq!(channel.name(), "room1");
        assert_eq!(channel.member_count(), 0);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_channel_insert_remove() {
        let mut channel = Channel::new("room1");
        let a = ConnectionId::from("conn-a");
        let b = ConnectionId::from("conn-b");

        assert!(channel.insert(a.clone()));
        assert!(!channel.insert(a.clone()));
        assert!(channel.insert(b.clone()));
        assert_eq!(channel.member_count(), 2);

        assert!(channel.remove(&a));
        assert!(!channel.is_member(&a));
        assert!(channel.is_member(&b));

        // Removing an absent member
        assert!(!channel.remove(&a));
    }

    #[test]
    fn test_channel_others_excludes_self() {
        let mut channel = Channel::new("room1");
        let a = ConnectionId::from("conn-a");
        let b = ConnectionId::from("conn-b");
        channel.insert(a.clone());
        channel.insert(b.clone());

        let others: Vec<_> = channel.others(&a).collect();
        assert_eq!(others, vec![&b]);
    }

    #[test]
    fn test_channel_name_validation() {
        assert_eq!(validate_channel_name(Some("room1")), Ok("room1"));
        assert_eq!(validate_channel_name(Some("Room1")), Ok("Room1"));
        assert_eq!(
            validate_channel_name(Some("")),
            Err(RouterError::ChannelRequired)
        );
        assert_eq!(
            validate_channel_name(None),
            Err(RouterError::ChannelRequired)
        );
    }
}
