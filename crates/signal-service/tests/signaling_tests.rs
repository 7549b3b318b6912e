//! Signaling actor integration tests.
//!
//! Drives the `SignalingActor` through its handle with a `RecordingSink` in
//! place of the WebSocket transport and a `MockMeetingStore` in place of the
//! meeting store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use common::protocol::{
    AnswerMade, CallUser, ChatLine, IceCandidate, IncomingCall, ParticipantSummary,
    RemoteIceCandidate, ServerEvent, UserDisconnected,
};
use common::types::{ConnectionId, RoomId};
use signal_service::actors::{ActorMetrics, SignalingActor, SignalingHandle};
use signal_service::errors::SignalError;
use signal_service::signaling::{DropReason, Negotiation, RelayOutcome, RelayScope};
use signal_service::store::MeetingStore;
use signal_test_utils::{
    answer, call, candidate, ice_candidate, sdp_answer, sdp_offer, MockMeetingStore,
    RecordingSink, TestParticipant,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    handle: SignalingHandle,
    sink: Arc<RecordingSink>,
    store: MockMeetingStore,
    _task: JoinHandle<()>,
}

impl Harness {
    fn spawn(scope: RelayScope) -> Self {
        let store = MockMeetingStore::new().with_meeting("r1").with_meeting("r2");
        Self::spawn_with_store(scope, store)
    }

    fn spawn_with_store(scope: RelayScope, store: MockMeetingStore) -> Self {
        let sink = RecordingSink::new();
        let shared_store: Arc<dyn MeetingStore> = Arc::new(store.clone());
        let (handle, task) = SignalingActor::spawn(
            sink.clone(),
            shared_store,
            scope,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        Self {
            handle,
            sink,
            store,
            _task: task,
        }
    }

    async fn join(&self, id: &str, who: &TestParticipant, room: &str) -> ConnectionId {
        let connection_id = ConnectionId::from(id);
        self.handle
            .join(connection_id.clone(), who.join_request(&RoomId::from(room)))
            .await
            .expect("join should succeed");
        connection_id
    }

    async fn members(&self, room: &str) -> HashSet<ConnectionId> {
        self.handle.members_of(RoomId::from(room)).await.unwrap()
    }
}

fn summary(name: &str, email: &str, id: &str) -> ParticipantSummary {
    ParticipantSummary {
        name: name.to_string(),
        email: email.to_string(),
        connection_id: ConnectionId::from(id),
    }
}

fn alice() -> TestParticipant {
    TestParticipant::new("Alice").with_email("a@x.com")
}

fn bob() -> TestParticipant {
    TestParticipant::new("Bob").with_email("b@x.com")
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_two_participants_are_introduced() {
    let h = Harness::spawn(RelayScope::Open);

    let c1 = h.join("c1", &alice(), "r1").await;
    assert_eq!(
        h.sink.events_for(&c1),
        vec![ServerEvent::ExistingParticipants(vec![])]
    );

    let c2 = h.join("c2", &bob(), "r1").await;
    assert_eq!(
        h.sink.events_for(&c2),
        vec![ServerEvent::ExistingParticipants(vec![summary(
            "Alice", "a@x.com", "c1"
        )])]
    );
    assert_eq!(
        h.sink.events_for(&c1)[1],
        ServerEvent::UserConnected(summary("Bob", "b@x.com", "c2"))
    );
}

#[tokio::test]
async fn test_offer_reaches_target_with_sender_name() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    h.sink.take();

    h.handle.handle_event(&c2, call(&c1)).await.unwrap();

    assert_eq!(
        h.sink.events_for(&c1),
        vec![ServerEvent::IncomingCall(IncomingCall {
            offer: sdp_offer(),
            from: c2.clone(),
            from_name: "Bob".to_string(),
        })]
    );
    assert!(h.sink.events_for(&c2).is_empty());
}

#[tokio::test]
async fn test_answer_and_candidate_relay() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    h.sink.take();

    h.handle.handle_event(&c1, answer(&c2)).await.unwrap();
    h.handle.handle_event(&c1, candidate(&c2)).await.unwrap();

    assert_eq!(
        h.sink.events_for(&c2),
        vec![
            ServerEvent::AnswerMade(AnswerMade {
                answer: sdp_answer(),
                from: c1.clone(),
            }),
            ServerEvent::IceCandidate(RemoteIceCandidate {
                candidate: ice_candidate(),
                from: c1.clone(),
            }),
        ]
    );
}

#[tokio::test]
async fn test_disconnect_notifies_room_and_silences_stale_relays() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    h.sink.take();

    h.handle.disconnect(c1.clone()).await.unwrap();
    assert_eq!(
        h.sink.events_for(&c2),
        vec![ServerEvent::UserDisconnected(UserDisconnected {
            connection_id: c1.clone(),
        })]
    );

    h.sink.take();
    let outcome = h
        .handle
        .relay(
            c2.clone(),
            Negotiation::Candidate(IceCandidate {
                candidate: ice_candidate(),
                target_connection_id: c1.clone(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome, RelayOutcome::Dropped(DropReason::StaleTarget));
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_unknown_meeting_leaves_state_untouched() {
    let h = Harness::spawn(RelayScope::Open);
    let c9 = ConnectionId::from("c9");

    let err = h
        .handle
        .join(c9.clone(), alice().join_request(&RoomId::from("nope")))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalError::MeetingNotFound));
    assert_eq!(h.sink.events_for(&c9), vec![ServerEvent::MeetingNotFound]);

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.participant_count(), 0);
    assert_eq!(snapshot.room_count(), 0);
}

// ----------------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_membership_stays_consistent_across_joins_and_leaves() {
    let h = Harness::spawn(RelayScope::Open);
    let rooms = ["r1", "r2"];

    for i in 0..12 {
        let who = TestParticipant::new(format!("user{i}"));
        h.join(&format!("c{i}"), &who, rooms[i % 2]).await;
        assert!(h.handle.snapshot().await.unwrap().is_consistent());
    }

    for i in (0..12).step_by(3) {
        h.handle
            .disconnect(ConnectionId::from(format!("c{i}").as_str()))
            .await
            .unwrap();
        assert!(h.handle.snapshot().await.unwrap().is_consistent());
    }

    let snapshot = h.handle.snapshot().await.unwrap();
    for room in rooms {
        let expected: HashSet<ConnectionId> = snapshot
            .registered
            .iter()
            .filter(|(_, r)| r.as_str() == room)
            .map(|(c, _)| c.clone())
            .collect();
        assert_eq!(h.members(room).await, expected);
    }
    assert_eq!(snapshot.participant_count(), 8);
}

#[tokio::test]
async fn test_joiner_never_sees_itself() {
    let h = Harness::spawn(RelayScope::Open);

    for i in 0..5 {
        let id = format!("c{i}");
        let connection_id = h.join(&id, &TestParticipant::new(&id), "r1").await;

        let Some(ServerEvent::ExistingParticipants(existing)) =
            h.sink.events_for(&connection_id).into_iter().next()
        else {
            panic!("first event must be the snapshot");
        };
        assert!(existing.iter().all(|p| p.connection_id != connection_id));
    }
}

#[tokio::test]
async fn test_each_pair_is_introduced_exactly_once() {
    const N: usize = 6;
    let h = Harness::spawn(RelayScope::Open);

    let mut ids = Vec::new();
    for k in 0..N {
        let id = format!("c{k}");
        ids.push(h.join(&id, &TestParticipant::new(&id), "r1").await);
    }

    for (k, id) in ids.iter().enumerate() {
        let events = h.sink.events_for(id);

        let ServerEvent::ExistingParticipants(existing) = &events[0] else {
            panic!("first event must be the snapshot");
        };
        assert_eq!(existing.len(), k);

        let introductions = events
            .iter()
            .filter(|e| matches!(e, ServerEvent::UserConnected(_)))
            .count();
        assert_eq!(introductions, N - k - 1);
    }
}

#[tokio::test]
async fn test_repeated_disconnect_broadcasts_once() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    h.sink.take();

    assert!(h.handle.disconnect(c1.clone()).await.unwrap().is_some());
    let after_first = h.handle.snapshot().await.unwrap();

    assert!(h.handle.disconnect(c1.clone()).await.unwrap().is_none());
    let after_second = h.handle.snapshot().await.unwrap();

    assert_eq!(h.sink.events_for(&c2).len(), 1);
    assert_eq!(after_first.registered, after_second.registered);
    assert_eq!(after_first.rooms, after_second.rooms);
}

#[tokio::test]
async fn test_relays_to_departed_connection_are_silent() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    h.handle.disconnect(c1.clone()).await.unwrap();
    h.sink.take();

    for event in [call(&c1), answer(&c1), candidate(&c1)] {
        h.handle.handle_event(&c2, event).await.unwrap();
    }

    assert!(h.sink.is_empty());
}

// ----------------------------------------------------------------------------
// Policies
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_duplicate_join_is_rejected_with_conflict() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    h.sink.take();

    let err = h
        .handle
        .join(c1.clone(), alice().join_request(&RoomId::from("r2")))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalError::DuplicateJoin));
    let events = h.sink.events_for(&c1);
    let [ServerEvent::JoinError(join_error)] = events.as_slice() else {
        panic!("expected a single join-error, got {events:?}");
    };
    assert_eq!(join_error.code, 5);
    assert_eq!(h.members("r2").await.len(), 0);
}

#[tokio::test]
async fn test_store_outage_rejects_join_generically() {
    let store = MockMeetingStore::new().with_meeting("r1");
    let h = Harness::spawn_with_store(RelayScope::Open, store);
    h.store.set_failing(true);

    let c1 = ConnectionId::from("c1");
    let err = h
        .handle
        .join(c1.clone(), alice().join_request(&RoomId::from("r1")))
        .await
        .unwrap_err();

    assert!(matches!(err, SignalError::Store(_)));
    let events = h.sink.events_for(&c1);
    let [ServerEvent::JoinError(join_error)] = events.as_slice() else {
        panic!("expected a single join-error, got {events:?}");
    };
    assert_eq!(join_error.code, 6);
    assert!(!join_error.message.contains("mock"));
}

#[tokio::test]
async fn test_same_room_scope_drops_cross_room_offer() {
    let h = Harness::spawn(RelayScope::SameRoom);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r2").await;
    h.sink.take();

    let outcome = h
        .handle
        .relay(
            c2.clone(),
            Negotiation::Offer(CallUser {
                offer: sdp_offer(),
                target_connection_id: c1.clone(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome, RelayOutcome::Dropped(DropReason::CrossRoom));
    assert!(h.sink.is_empty());
}

#[tokio::test]
async fn test_open_scope_relays_across_rooms() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r2").await;
    h.sink.take();

    h.handle.handle_event(&c2, call(&c1)).await.unwrap();

    assert_eq!(h.sink.event_names_for(&c1), vec!["incoming-call"]);
}

#[tokio::test]
async fn test_chat_reaches_everyone_else_under_registered_name() {
    let h = Harness::spawn(RelayScope::Open);
    let c1 = h.join("c1", &alice(), "r1").await;
    let c2 = h.join("c2", &bob(), "r1").await;
    let c3 = h.join("c3", &TestParticipant::new("Carol"), "r1").await;
    h.sink.take();

    let spoofed = TestParticipant::new("Mallory");
    h.handle
        .handle_event(&c1, spoofed.chat(&RoomId::from("r1"), "hello"))
        .await
        .unwrap();

    let expected = ServerEvent::ChatMessage(ChatLine {
        sender_name: "Alice".to_string(),
        message: "hello".to_string(),
    });
    assert_eq!(h.sink.events_for(&c2), vec![expected.clone()]);
    assert_eq!(h.sink.events_for(&c3), vec![expected]);
    assert!(h.sink.events_for(&c1).is_empty());
}

#[tokio::test]
async fn test_successful_join_is_recorded_in_store() {
    let h = Harness::spawn(RelayScope::Open);
    h.join("c1", &alice(), "r1").await;

    let recorded = h.store.wait_for_participants(1).await;
    assert_eq!(recorded[0].room_id, RoomId::from("r1"));
    assert_eq!(recorded[0].name, "Alice");
    assert_eq!(recorded[0].email, "a@x.com");
}

#[tokio::test]
async fn test_concurrent_joins_are_serialized() {
    let h = Harness::spawn(RelayScope::Open);

    let mut tasks = Vec::new();
    for i in 0..20 {
        let handle = h.handle.clone();
        tasks.push(tokio::spawn(async move {
            let id = format!("c{i}");
            handle
                .join(
                    ConnectionId::from(id.as_str()),
                    TestParticipant::new(&id).join_request(&RoomId::from("r1")),
                )
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.is_consistent());
    assert_eq!(h.members("r1").await.len(), 20);

    // Each pair shows up twice: in the later joiner's snapshot and as an
    // introduction to the earlier one
    let total_introductions: usize = (0..20)
        .map(|i| {
            let id = ConnectionId::from(format!("c{i}").as_str());
            h.sink
                .events_for(&id)
                .iter()
                .map(|e| match e {
                    ServerEvent::ExistingParticipants(existing) => existing.len(),
                    ServerEvent::UserConnected(_) => 1,
                    _ => 0,
                })
                .sum::<usize>()
        })
        .sum();
    assert_eq!(total_introductions, 20 * 19);
}
