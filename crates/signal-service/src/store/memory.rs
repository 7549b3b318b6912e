use super::{MeetingStore, StoreError};
use chrono::{DateTime, Utc};
use common::types::RoomId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// One person recorded against a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingUser {
    pub name: String,
    pub email: String,
}

/// Stored meeting record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    pub meeting_id: RoomId,
    pub created_at: DateTime<Utc>,
    pub users: Vec<MeetingUser>,
}

/// Process-local meeting store.
///
/// Meetings live until the process exits.
#[derive(Debug, Default)]
pub struct InMemoryMeetingStore {
    meetings: RwLock<HashMap<RoomId, Meeting>>,
}

impl InMemoryMeetingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the stored record for `room_id`.
    pub async fn meeting(&self, room_id: &RoomId) -> Option<Meeting> {
        self.meetings.read().await.get(room_id).cloned()
    }

    pub async fn meeting_count(&self) -> usize {
        self.meetings.read().await.len()
    }
}

#[async_trait::async_trait]
impl MeetingStore for InMemoryMeetingStore {
    #[instrument(skip_all, name = "signal.store.create_meeting")]
    async fn create_meeting(&self) -> Result<RoomId, StoreError> {
        let meeting_id = RoomId::generate();
        let meeting = Meeting {
            meeting_id: meeting_id.clone(),
            created_at: Utc::now(),
            users: Vec::new(),
        };
        self.meetings
            .write()
            .await
            .insert(meeting_id.clone(), meeting);

        debug!(target: "signal.store", meeting_id = %meeting_id, "Meeting created");
        Ok(meeting_id)
    }

    async fn meeting_exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        Ok(self.meetings.read().await.contains_key(room_id))
    }

    #[instrument(skip_all, name = "signal.store.record_participant", fields(meeting_id = %room_id))]
    async fn record_participant(
        &self,
        room_id: &RoomId,
        name: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        let mut meetings = self.meetings.write().await;
        let meeting = meetings
            .get_mut(room_id)
            .ok_or_else(|| StoreError::UnknownMeeting(room_id.clone()))?;

        if meeting.users.iter().any(|user| user.email == email) {
            return Ok(());
        }
        meeting.users.push(MeetingUser {
            name: name.to_string(),
            email: email.to_string(),
        });

        debug!(
            target: "signal.store",
            meeting_id = %room_id,
            users = meeting.users.len(),
            "Participant recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_exists() {
        let store = InMemoryMeetingStore::new();
        let id = store.create_meeting().await.unwrap();

        assert!(store.meeting_exists(&id).await.unwrap());
        assert!(!store.meeting_exists(&RoomId::from("nope")).await.unwrap());
        assert_eq!(store.meeting_count().await, 1);
    }

    #[tokio::test]
    async fn test_created_meetings_are_distinct() {
        let store = InMemoryMeetingStore::new();
        let a = store.create_meeting().await.unwrap();
        let b = store.create_meeting().await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_record_participant_dedupes_by_email() {
        let store = InMemoryMeetingStore::new();
        let id = store.create_meeting().await.unwrap();

        store.record_participant(&id, "Alice", "a@x.com").await.unwrap();
        store.record_participant(&id, "Alice (phone)", "a@x.com").await.unwrap();
        store.record_participant(&id, "Bob", "b@x.com").await.unwrap();

        let meeting = store.meeting(&id).await.unwrap();
        assert_eq!(meeting.users.len(), 2);
        assert_eq!(meeting.users[0].name, "Alice", "first name recorded wins");
        assert_eq!(meeting.users[1].email, "b@x.com");
    }

    #[tokio::test]
    async fn test_record_participant_unknown_meeting() {
        let store = InMemoryMeetingStore::new();
        let err = store
            .record_participant(&RoomId::from("nope"), "Alice", "a@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownMeeting(id) if id == RoomId::from("nope")));
    }
}
