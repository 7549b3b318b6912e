//! Mock meeting store.
//!
//! # Example
//!
//! ```rust,ignore
//! use signal_test_utils::MockMeetingStore;
//!
//! let store = MockMeetingStore::new().with_meeting("room-1");
//! assert!(store.meeting_exists(&RoomId::from("room-1")).await?);
//!
//! let broken = MockMeetingStore::failing();
//! assert!(broken.meeting_exists(&RoomId::from("room-1")).await.is_err());
//! ```

use common::types::RoomId;
use signal_service::store::{MeetingStore, StoreError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One `record_participant` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedParticipant {
    pub room_id: RoomId,
    pub name: String,
    pub email: String,
}

/// Scriptable `MeetingStore` for tests.
///
/// Clones share state, so a test can keep one clone for assertions and hand
/// another to the service.
#[derive(Debug, Clone, Default)]
pub struct MockMeetingStore {
    inner: Arc<MockStoreInner>,
}

#[derive(Debug, Default)]
struct MockStoreInner {
    meetings: Mutex<HashSet<RoomId>>,
    participants: Mutex<Vec<RecordedParticipant>>,
    /// Every call fails with `Unavailable` while set
    failing: AtomicBool,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MockMeetingStore {
    /// Store with no meetings that answers every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    /// Add a meeting with the given ID.
    #[must_use]
    pub fn with_meeting(self, room_id: &str) -> Self {
        self.inner
            .meetings
            .lock()
            .unwrap()
            .insert(RoomId::from(room_id));
        self
    }

    /// Toggle failure mode.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `meeting_exists` calls made.
    pub fn exists_calls(&self) -> usize {
        self.inner.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of `create_meeting` calls made.
    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    /// Every successful `record_participant` call, in call order.
    pub fn recorded_participants(&self) -> Vec<RecordedParticipant> {
        self.inner.participants.lock().unwrap().clone()
    }

    /// Wait until at least `count` participants have been recorded.
    ///
    /// Participant recording runs in a background task after a join, so
    /// tests poll for it. Panics after one second.
    pub async fn wait_for_participants(&self, count: usize) -> Vec<RecordedParticipant> {
        let poll = async {
            loop {
                let recorded = self.recorded_participants();
                if recorded.len() >= count {
                    return recorded;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(1), poll)
            .await
            .unwrap_or_else(|_| panic!("expected {count} recorded participants"))
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("mock store failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl MeetingStore for MockMeetingStore {
    async fn create_meeting(&self) -> Result<RoomId, StoreError> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let room_id = RoomId::generate();
        self.inner.meetings.lock().unwrap().insert(room_id.clone());
        Ok(room_id)
    }

    async fn meeting_exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        self.inner.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        Ok(self.inner.meetings.lock().unwrap().contains(room_id))
    }

    async fn record_participant(
        &self,
        room_id: &RoomId,
        name: &str,
        email: &str,
    ) -> Result<(), StoreError> {
        self.check_available()?;

        if !self.inner.meetings.lock().unwrap().contains(room_id) {
            return Err(StoreError::UnknownMeeting(room_id.clone()));
        }
        self.inner.participants.lock().unwrap().push(RecordedParticipant {
            room_id: room_id.clone(),
            name: name.to_string(),
            email: email.to_string(),
        });
        Ok(())
    }
}
