//! Meeting store collaborator.
//!
//! The store issues meeting IDs, answers whether a room exists, and keeps the
//! list of people who have joined each meeting. The signaling core only reads
//! existence (before a join) and fires [`MeetingStore::record_participant`]
//! after a successful join; live membership never lives here.

mod memory;

pub use memory::{InMemoryMeetingStore, Meeting, MeetingUser};

use common::types::RoomId;
use thiserror::Error;

/// Meeting store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or timed out.
    #[error("meeting store unavailable: {0}")]
    Unavailable(String),

    /// `record_participant` addressed a meeting that does not exist.
    #[error("meeting {0} does not exist")]
    UnknownMeeting(RoomId),
}

/// Trait for meeting store operations (enables mocking).
#[async_trait::async_trait]
pub trait MeetingStore: Send + Sync {
    /// Create a meeting and return its ID.
    async fn create_meeting(&self) -> Result<RoomId, StoreError>;

    /// Whether `room_id` names a meeting.
    async fn meeting_exists(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// Record that `email` joined `room_id` as `name`.
    ///
    /// A user is recorded once per meeting, keyed by email; later joins with
    /// the same email are ignored.
    async fn record_participant(
        &self,
        room_id: &RoomId,
        name: &str,
        email: &str,
    ) -> Result<(), StoreError>;
}
