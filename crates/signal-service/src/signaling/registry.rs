//! Connection registry: connection ID -> participant identity.

use common::protocol::ParticipantSummary;
use common::types::{ConnectionId, RoomId};
use std::collections::HashMap;

/// Identity attached to one joined connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Stable identity key (may repeat across reconnects).
    pub email: String,
    /// Live connection this participant is bound to.
    pub connection_id: ConnectionId,
    /// Room the participant joined.
    pub room_id: RoomId,
}

impl Participant {
    /// Public view sent to other room members.
    #[must_use]
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            name: self.name.clone(),
            email: self.email.clone(),
            connection_id: self.connection_id.clone(),
        }
    }
}

/// Maps live connections to the participant that joined on them.
///
/// The registry enforces nothing about join cardinality; the lifecycle
/// controller is the only writer.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, Participant>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the participant for `connection_id`.
    pub fn register(&mut self, connection_id: ConnectionId, participant: Participant) {
        self.entries.insert(connection_id, participant);
    }

    #[must_use]
    pub fn lookup(&self, connection_id: &ConnectionId) -> Option<&Participant> {
        self.entries.get(connection_id)
    }

    /// Remove and return the entry. Unknown IDs return `None`.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<Participant> {
        self.entries.remove(connection_id)
    }

    #[must_use]
    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.entries.contains_key(connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &Participant)> {
        self.entries.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn alice() -> Participant {
        Participant {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            connection_id: ConnectionId::from("c1"),
            room_id: RoomId::from("r1"),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ConnectionRegistry::new();
        assert!(registry.lookup(&ConnectionId::from("c1")).is_none());

        registry.register(ConnectionId::from("c1"), alice());

        let found = registry.lookup(&ConnectionId::from("c1")).unwrap();
        assert_eq!(found.name, "Alice");
        assert_eq!(found.room_id, RoomId::from("r1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_overwrites() {
        let mut registry = ConnectionRegistry::new();
        registry.register(ConnectionId::from("c1"), alice());

        let mut renamed = alice();
        renamed.name = "Alicia".to_string();
        registry.register(ConnectionId::from("c1"), renamed);

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(&ConnectionId::from("c1")).unwrap().name,
            "Alicia"
        );
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        registry.register(ConnectionId::from("c1"), alice());

        let removed = registry.unregister(&ConnectionId::from("c1"));
        assert_eq!(removed, Some(alice()));
        assert!(registry.is_empty());

        assert!(registry.unregister(&ConnectionId::from("c1")).is_none());
    }

    #[test]
    fn test_summary() {
        let summary = alice().summary();
        assert_eq!(summary.name, "Alice");
        assert_eq!(summary.email, "a@x.com");
        assert_eq!(summary.connection_id, ConnectionId::from("c1"));
    }
}
