//! Session lifecycle controller.
//!
//! Owns the [`ConnectionRegistry`] and [`RoomDirectory`] and applies every
//! join, relay, chat and leave as one synchronous transition. Outbound events
//! are queued in an [`Outbox`] supplied by the caller; nothing here performs
//! I/O. The signaling actor is the only owner, which makes it the single
//! serialized boundary for both structures.
//!
//! Per-connection phases:
//!
//! ```text
//! (absent) --join--> Joined --leave--> Closed
//!     |                 |                 |
//!     +--- disconnect --+--- disconnect --+--> (forgotten)
//! ```
//!
//! A connection with no recorded phase is unjoined. Disconnect forgets the
//! connection entirely since its ID is never reused.

use crate::errors::SignalError;
use crate::signaling::directory::RoomDirectory;
use crate::signaling::registry::{ConnectionRegistry, Participant};
use crate::signaling::router::{DropReason, Outbox};
use common::protocol::{
    AnswerMade, CallUser, ChatLine, ChatMessage, IceCandidate, IncomingCall, JoinRoom,
    MakeAnswer, ParticipantSummary, RemoteIceCandidate, ServerEvent, UserDisconnected,
};
use common::types::{ConnectionId, RoomId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Display name used in `incoming-call` when the sender is not registered.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Lifecycle phase of a connection that has at least attempted a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Joined,
    /// Terminal. Reached by an explicit leave; the socket may still be open.
    Closed,
}

/// Result of the meeting-store lookup performed before a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomLookup {
    Found,
    Missing,
    /// The store failed; carries the error text for logging.
    Failed(String),
}

/// Whether relays must stay within the sender's room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayScope {
    /// Any registered target may be addressed.
    #[default]
    Open,
    /// Sender must be joined and the target must share its room.
    SameRoom,
}

/// Peer-to-peer negotiation message addressed to one target.
#[derive(Debug, Clone, PartialEq)]
pub enum Negotiation {
    Offer(CallUser),
    Answer(MakeAnswer),
    Candidate(IceCandidate),
}

impl Negotiation {
    #[must_use]
    pub fn target(&self) -> &ConnectionId {
        match self {
            Negotiation::Offer(call) => &call.target_connection_id,
            Negotiation::Answer(answer) => &answer.target_connection_id,
            Negotiation::Candidate(candidate) => &candidate.target_connection_id,
        }
    }

    /// Metric label value.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Negotiation::Offer(_) => "offer",
            Negotiation::Answer(_) => "answer",
            Negotiation::Candidate(_) => "candidate",
        }
    }
}

/// Outcome of a relay or chat transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Queued for this many recipients.
    Delivered(usize),
    Dropped(DropReason),
}

/// Successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub participant: Participant,
    /// Members that were already in the room, excluding the joiner.
    pub existing: Vec<ParticipantSummary>,
}

/// Point-in-time copy of registry and directory contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalingSnapshot {
    /// Registered connection -> room it is registered under.
    pub registered: BTreeMap<ConnectionId, RoomId>,
    /// Room -> members according to the directory.
    pub rooms: BTreeMap<RoomId, BTreeSet<ConnectionId>>,
    /// Connections that explicitly left but are still open.
    pub closed: usize,
}

impl SignalingSnapshot {
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.registered.len()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether every room's member set is exactly the set of connections
    /// registered under that room.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut expected: BTreeMap<RoomId, BTreeSet<ConnectionId>> = BTreeMap::new();
        for (connection_id, room_id) in &self.registered {
            expected
                .entry(room_id.clone())
                .or_default()
                .insert(connection_id.clone());
        }
        expected == self.rooms
    }
}

/// Registry, directory and phases behind one owner.
#[derive(Debug, Default)]
pub struct SessionLifecycle {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    phases: HashMap<ConnectionId, SessionPhase>,
    scope: RelayScope,
}

impl SessionLifecycle {
    #[must_use]
    pub fn new(scope: RelayScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn phase(&self, connection_id: &ConnectionId) -> Option<SessionPhase> {
        self.phases.get(connection_id).copied()
    }

    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Join `connection_id` to the requested room.
    ///
    /// `lookup` is the meeting-store answer obtained before this call. On
    /// rejection the requester gets `meeting-not-found` or `join-error` and
    /// no state changes. On success the requester gets
    /// `existing-participants` and the other members get `user-connected`,
    /// queued in that order.
    pub fn join(
        &mut self,
        connection_id: &ConnectionId,
        request: JoinRoom,
        lookup: RoomLookup,
        outbox: &mut Outbox,
    ) -> Result<JoinReceipt, SignalError> {
        if let Err(err) = self.check_join(connection_id, lookup) {
            outbox.reply(connection_id, err.to_event());
            return Err(err);
        }

        let JoinRoom {
            room_id,
            name,
            email,
        } = request;

        let existing: Vec<ParticipantSummary> = self
            .directory
            .iter_members(&room_id)
            .filter(|member| *member != connection_id)
            .filter_map(|member| self.registry.lookup(member))
            .map(Participant::summary)
            .collect();

        let participant = Participant {
            name,
            email,
            connection_id: connection_id.clone(),
            room_id: room_id.clone(),
        };

        self.registry
            .register(connection_id.clone(), participant.clone());
        self.directory.add(&room_id, connection_id.clone());
        self.phases
            .insert(connection_id.clone(), SessionPhase::Joined);

        outbox.reply(
            connection_id,
            ServerEvent::ExistingParticipants(existing.clone()),
        );
        outbox.broadcast_to_room_except(
            &self.directory,
            &room_id,
            connection_id,
            &ServerEvent::UserConnected(participant.summary()),
        );

        Ok(JoinReceipt {
            participant,
            existing,
        })
    }

    fn check_join(
        &self,
        connection_id: &ConnectionId,
        lookup: RoomLookup,
    ) -> Result<(), SignalError> {
        match self.phase(connection_id) {
            Some(SessionPhase::Joined) => return Err(SignalError::DuplicateJoin),
            Some(SessionPhase::Closed) => return Err(SignalError::SessionClosed),
            None => {}
        }

        match lookup {
            RoomLookup::Found => Ok(()),
            RoomLookup::Missing => Err(SignalError::MeetingNotFound),
            RoomLookup::Failed(reason) => Err(SignalError::Store(reason)),
        }
    }

    /// Relay an offer, answer or candidate to its explicit target.
    pub fn relay(
        &self,
        sender: &ConnectionId,
        negotiation: Negotiation,
        outbox: &mut Outbox,
    ) -> RelayOutcome {
        if let Some(reason) = self.check_relay(sender, negotiation.target()) {
            return RelayOutcome::Dropped(reason);
        }

        let from = sender.clone();
        let (target, event) = match negotiation {
            Negotiation::Offer(call) => {
                let from_name = self
                    .registry
                    .lookup(sender)
                    .map_or_else(|| UNKNOWN_SENDER.to_string(), |p| p.name.clone());
                (
                    call.target_connection_id,
                    ServerEvent::IncomingCall(IncomingCall {
                        offer: call.offer,
                        from,
                        from_name,
                    }),
                )
            }
            Negotiation::Answer(answer) => (
                answer.target_connection_id,
                ServerEvent::AnswerMade(AnswerMade {
                    answer: answer.answer,
                    from,
                }),
            ),
            Negotiation::Candidate(candidate) => (
                candidate.target_connection_id,
                ServerEvent::IceCandidate(RemoteIceCandidate {
                    candidate: candidate.candidate,
                    from,
                }),
            ),
        };

        if outbox.unicast(&self.registry, &target, event) {
            RelayOutcome::Delivered(1)
        } else {
            RelayOutcome::Dropped(DropReason::StaleTarget)
        }
    }

    fn check_relay(&self, sender: &ConnectionId, target: &ConnectionId) -> Option<DropReason> {
        if self.phase(sender) == Some(SessionPhase::Closed) {
            return Some(DropReason::SenderClosed);
        }
        if self.scope == RelayScope::Open {
            return None;
        }

        let Some(from) = self.registry.lookup(sender) else {
            return Some(DropReason::SenderNotJoined);
        };
        if !self.registry.contains(target) {
            return Some(DropReason::StaleTarget);
        }
        if !self.directory.contains(&from.room_id, target) {
            return Some(DropReason::CrossRoom);
        }
        None
    }

    /// Broadcast a chat line to the rest of the sender's room.
    ///
    /// The sender's registered name is used; the room named in the message
    /// must be the one the sender joined.
    pub fn chat(
        &self,
        sender: &ConnectionId,
        message: ChatMessage,
        outbox: &mut Outbox,
    ) -> RelayOutcome {
        let Some(participant) = self.registry.lookup(sender) else {
            return RelayOutcome::Dropped(match self.phase(sender) {
                Some(SessionPhase::Closed) => DropReason::SenderClosed,
                _ => DropReason::SenderNotJoined,
            });
        };
        if participant.room_id != message.room_id {
            return RelayOutcome::Dropped(DropReason::RoomMismatch);
        }

        let line = ServerEvent::ChatMessage(ChatLine {
            sender_name: participant.name.clone(),
            message: message.message,
        });
        RelayOutcome::Delivered(outbox.broadcast_to_room_except(
            &self.directory,
            &participant.room_id,
            sender,
            &line,
        ))
    }

    /// Explicit leave. The connection becomes `Closed`.
    ///
    /// Returns the removed participant, or `None` if the connection was not
    /// joined (no broadcast in that case).
    pub fn leave(
        &mut self,
        connection_id: &ConnectionId,
        outbox: &mut Outbox,
    ) -> Option<Participant> {
        let participant = self.registry.unregister(connection_id)?;
        self.directory.remove(&participant.room_id, connection_id);
        self.phases
            .insert(connection_id.clone(), SessionPhase::Closed);

        outbox.broadcast_to_room_except(
            &self.directory,
            &participant.room_id,
            connection_id,
            &ServerEvent::UserDisconnected(UserDisconnected {
                connection_id: connection_id.clone(),
            }),
        );
        Some(participant)
    }

    /// Transport closed. Leaves if joined, then forgets the connection.
    pub fn disconnect(
        &mut self,
        connection_id: &ConnectionId,
        outbox: &mut Outbox,
    ) -> Option<Participant> {
        let left = self.leave(connection_id, outbox);
        self.phases.remove(connection_id);
        left
    }

    #[must_use]
    pub fn snapshot(&self) -> SignalingSnapshot {
        SignalingSnapshot {
            registered: self
                .registry
                .iter()
                .map(|(id, p)| (id.clone(), p.room_id.clone()))
                .collect(),
            rooms: self
                .directory
                .rooms()
                .map(|(room, members)| (room.clone(), members.iter().cloned().collect()))
                .collect(),
            closed: self
                .phases
                .values()
                .filter(|phase| **phase == SessionPhase::Closed)
                .count(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::signaling::router::Delivery;
    use common::protocol::SignalBlob;

    fn join_req(room: &str, name: &str) -> JoinRoom {
        JoinRoom {
            room_id: RoomId::from(room),
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
        }
    }

    fn id(raw: &str) -> ConnectionId {
        ConnectionId::from(raw)
    }

    fn join_ok(
        lifecycle: &mut SessionLifecycle,
        conn: &str,
        room: &str,
        name: &str,
    ) -> Vec<Delivery> {
        let mut outbox = Outbox::new();
        lifecycle
            .join(&id(conn), join_req(room, name), RoomLookup::Found, &mut outbox)
            .unwrap();
        outbox.into_deliveries()
    }

    fn offer(target: &str) -> Negotiation {
        Negotiation::Offer(CallUser {
            offer: SignalBlob::from_json(r#"{"type":"offer","sdp":"v=0"}"#).unwrap(),
            target_connection_id: id(target),
        })
    }

    #[test]
    fn test_first_joiner_gets_empty_snapshot() {
        let mut lifecycle = SessionLifecycle::default();
        let deliveries = join_ok(&mut lifecycle, "c1", "r1", "Alice");

        assert_eq!(
            deliveries,
            vec![Delivery {
                target: id("c1"),
                event: ServerEvent::ExistingParticipants(vec![]),
            }]
        );
        assert_eq!(lifecycle.phase(&id("c1")), Some(SessionPhase::Joined));
    }

    #[test]
    fn test_second_joiner_snapshot_then_introduction() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        let deliveries = join_ok(&mut lifecycle, "c2", "r1", "Bob");

        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].target, id("c2"));
        let ServerEvent::ExistingParticipants(existing) = &deliveries[0].event else {
            panic!("expected existing-participants first");
        };
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].name, "Alice");

        assert_eq!(deliveries[1].target, id("c1"));
        assert!(matches!(
            &deliveries[1].event,
            ServerEvent::UserConnected(p) if p.connection_id == id("c2") && p.name == "Bob"
        ));
    }

    #[test]
    fn test_missing_room_leaves_state_untouched() {
        let mut lifecycle = SessionLifecycle::default();
        let mut outbox = Outbox::new();

        let result = lifecycle.join(
            &id("c1"),
            join_req("nope", "Alice"),
            RoomLookup::Missing,
            &mut outbox,
        );

        assert!(matches!(result, Err(SignalError::MeetingNotFound)));
        assert_eq!(
            outbox.into_deliveries(),
            vec![Delivery {
                target: id("c1"),
                event: ServerEvent::MeetingNotFound,
            }]
        );
        assert_eq!(lifecycle.snapshot(), SignalingSnapshot::default());
        assert_eq!(lifecycle.phase(&id("c1")), None);
    }

    #[test]
    fn test_store_failure_is_generic_rejection() {
        let mut lifecycle = SessionLifecycle::default();
        let mut outbox = Outbox::new();

        let result = lifecycle.join(
            &id("c1"),
            join_req("r1", "Alice"),
            RoomLookup::Failed("connection reset".to_string()),
            &mut outbox,
        );

        assert!(matches!(result, Err(SignalError::Store(_))));
        let deliveries = outbox.into_deliveries();
        assert!(matches!(&deliveries[0].event, ServerEvent::JoinError(e) if e.code == 6));
        assert!(lifecycle.registry().is_empty());
    }

    #[test]
    fn test_duplicate_join_is_rejected() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");

        let mut outbox = Outbox::new();
        let result = lifecycle.join(
            &id("c1"),
            join_req("r2", "Alice"),
            RoomLookup::Found,
            &mut outbox,
        );

        assert!(matches!(result, Err(SignalError::DuplicateJoin)));
        let deliveries = outbox.into_deliveries();
        assert_eq!(deliveries.len(), 1, "only the requester hears about it");
        assert!(matches!(&deliveries[0].event, ServerEvent::JoinError(e) if e.code == 5));
        assert_eq!(
            lifecycle.registry().lookup(&id("c1")).unwrap().room_id,
            RoomId::from("r1")
        );
        assert!(lifecycle.snapshot().is_consistent());
    }

    #[test]
    fn test_join_after_leave_is_rejected() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        lifecycle.leave(&id("c1"), &mut Outbox::new());

        let mut outbox = Outbox::new();
        let result = lifecycle.join(
            &id("c1"),
            join_req("r1", "Alice"),
            RoomLookup::Found,
            &mut outbox,
        );
        assert!(matches!(result, Err(SignalError::SessionClosed)));
        assert!(lifecycle.registry().is_empty());
    }

    #[test]
    fn test_offer_carries_sender_name() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");

        let mut outbox = Outbox::new();
        let outcome = lifecycle.relay(&id("c2"), offer("c1"), &mut outbox);

        assert_eq!(outcome, RelayOutcome::Delivered(1));
        let deliveries = outbox.into_deliveries();
        assert_eq!(deliveries[0].target, id("c1"));
        assert_eq!(
            deliveries[0].event,
            ServerEvent::IncomingCall(IncomingCall {
                offer: SignalBlob::from_json(r#"{"type":"offer","sdp":"v=0"}"#).unwrap(),
                from: id("c2"),
                from_name: "Bob".to_string(),
            })
        );
    }

    #[test]
    fn test_offer_from_unjoined_sender_uses_unknown() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");

        let mut outbox = Outbox::new();
        lifecycle.relay(&id("lurker"), offer("c1"), &mut outbox);

        let deliveries = outbox.into_deliveries();
        assert!(matches!(
            &deliveries[0].event,
            ServerEvent::IncomingCall(call) if call.from_name == UNKNOWN_SENDER
        ));
    }

    #[test]
    fn test_relay_to_stale_target_is_dropped() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");

        let mut outbox = Outbox::new();
        let outcome = lifecycle.relay(
            &id("c1"),
            Negotiation::Candidate(IceCandidate {
                candidate: SignalBlob::from_json(r#"{"candidate":"a=1"}"#).unwrap(),
                target_connection_id: id("c9"),
            }),
            &mut outbox,
        );

        assert_eq!(outcome, RelayOutcome::Dropped(DropReason::StaleTarget));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_open_scope_allows_cross_room_relay() {
        let mut lifecycle = SessionLifecycle::new(RelayScope::Open);
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r2", "Bob");

        let outcome = lifecycle.relay(&id("c2"), offer("c1"), &mut Outbox::new());
        assert_eq!(outcome, RelayOutcome::Delivered(1));
    }

    #[test]
    fn test_same_room_scope_drops_cross_room_relay() {
        let mut lifecycle = SessionLifecycle::new(RelayScope::SameRoom);
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r2", "Bob");
        join_ok(&mut lifecycle, "c3", "r1", "Carol");

        let mut outbox = Outbox::new();
        assert_eq!(
            lifecycle.relay(&id("c2"), offer("c1"), &mut outbox),
            RelayOutcome::Dropped(DropReason::CrossRoom)
        );
        assert_eq!(
            lifecycle.relay(&id("lurker"), offer("c1"), &mut outbox),
            RelayOutcome::Dropped(DropReason::SenderNotJoined)
        );
        assert!(outbox.is_empty());

        assert_eq!(
            lifecycle.relay(&id("c3"), offer("c1"), &mut outbox),
            RelayOutcome::Delivered(1)
        );
    }

    #[test]
    fn test_closed_sender_cannot_relay() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");
        lifecycle.leave(&id("c2"), &mut Outbox::new());

        let outcome = lifecycle.relay(&id("c2"), offer("c1"), &mut Outbox::new());
        assert_eq!(outcome, RelayOutcome::Dropped(DropReason::SenderClosed));
    }

    #[test]
    fn test_chat_uses_registered_name() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");
        join_ok(&mut lifecycle, "c3", "r2", "Carol");

        let mut outbox = Outbox::new();
        let outcome = lifecycle.chat(
            &id("c1"),
            ChatMessage {
                room_id: RoomId::from("r1"),
                sender_name: "Mallory".to_string(),
                message: "hi".to_string(),
            },
            &mut outbox,
        );

        assert_eq!(outcome, RelayOutcome::Delivered(1));
        assert_eq!(
            outbox.into_deliveries(),
            vec![Delivery {
                target: id("c2"),
                event: ServerEvent::ChatMessage(ChatLine {
                    sender_name: "Alice".to_string(),
                    message: "hi".to_string(),
                }),
            }]
        );
    }

    #[test]
    fn test_chat_to_foreign_room_is_dropped() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");

        let outcome = lifecycle.chat(
            &id("c1"),
            ChatMessage {
                room_id: RoomId::from("r2"),
                sender_name: "Alice".to_string(),
                message: "hi".to_string(),
            },
            &mut Outbox::new(),
        );
        assert_eq!(outcome, RelayOutcome::Dropped(DropReason::RoomMismatch));

        let outcome = lifecycle.chat(
            &id("nobody"),
            ChatMessage {
                room_id: RoomId::from("r1"),
                sender_name: "?".to_string(),
                message: "hi".to_string(),
            },
            &mut Outbox::new(),
        );
        assert_eq!(outcome, RelayOutcome::Dropped(DropReason::SenderNotJoined));
    }

    #[test]
    fn test_leave_broadcasts_once() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");

        let mut outbox = Outbox::new();
        let left = lifecycle.leave(&id("c1"), &mut outbox);
        assert_eq!(left.unwrap().name, "Alice");
        assert_eq!(
            outbox.into_deliveries(),
            vec![Delivery {
                target: id("c2"),
                event: ServerEvent::UserDisconnected(UserDisconnected {
                    connection_id: id("c1"),
                }),
            }]
        );
        assert_eq!(lifecycle.phase(&id("c1")), Some(SessionPhase::Closed));

        let mut outbox = Outbox::new();
        assert!(lifecycle.leave(&id("c1"), &mut outbox).is_none());
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent_and_forgets() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        join_ok(&mut lifecycle, "c2", "r1", "Bob");

        let mut outbox = Outbox::new();
        lifecycle.disconnect(&id("c1"), &mut outbox);
        assert_eq!(outbox.len(), 1);
        let after_first = lifecycle.snapshot();

        let mut outbox = Outbox::new();
        assert!(lifecycle.disconnect(&id("c1"), &mut outbox).is_none());
        assert!(outbox.is_empty());
        assert_eq!(lifecycle.snapshot(), after_first);
        assert_eq!(lifecycle.phase(&id("c1")), None);
    }

    #[test]
    fn test_leave_of_unjoined_connection_is_noop() {
        let mut lifecycle = SessionLifecycle::default();
        let mut outbox = Outbox::new();

        assert!(lifecycle.leave(&id("c1"), &mut outbox).is_none());
        assert!(outbox.is_empty());
        assert_eq!(lifecycle.phase(&id("c1")), None);
    }

    #[test]
    fn test_last_leave_drops_room() {
        let mut lifecycle = SessionLifecycle::default();
        join_ok(&mut lifecycle, "c1", "r1", "Alice");
        assert_eq!(lifecycle.snapshot().room_count(), 1);

        lifecycle.disconnect(&id("c1"), &mut Outbox::new());

        let snapshot = lifecycle.snapshot();
        assert_eq!(snapshot.room_count(), 0);
        assert_eq!(snapshot.participant_count(), 0);
        assert!(snapshot.is_consistent());
    }
}
