//! Room directory: room ID -> set of joined connection IDs.

use common::types::{ConnectionId, RoomId};
use std::collections::{HashMap, HashSet};

/// Membership view over the registry.
///
/// A room exists here only while it has members; removing the last member
/// drops the entry.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
}

impl RoomDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current members of `room_id`. Unknown rooms are empty.
    #[must_use]
    pub fn members_of(&self, room_id: &RoomId) -> HashSet<ConnectionId> {
        self.rooms.get(room_id).cloned().unwrap_or_default()
    }

    /// Iterate members without cloning the set.
    pub fn iter_members<'a>(
        &'a self,
        room_id: &RoomId,
    ) -> impl Iterator<Item = &'a ConnectionId> + 'a {
        self.rooms.get(room_id).into_iter().flatten()
    }

    pub fn add(&mut self, room_id: &RoomId, connection_id: ConnectionId) {
        self.rooms
            .entry(room_id.clone())
            .or_default()
            .insert(connection_id);
    }

    pub fn remove(&mut self, room_id: &RoomId, connection_id: &ConnectionId) {
        if let Some(members) = self.rooms.get_mut(room_id) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(room_id);
            }
        }
    }

    #[must_use]
    pub fn contains(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = (&RoomId, &HashSet<ConnectionId>)> {
        self.rooms.iter()
    }
}
