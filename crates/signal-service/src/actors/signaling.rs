//! `SignalingActor` - singleton owner of the session lifecycle.
//!
//! Every join, relay, chat, leave and disconnect from every socket is a
//! message on this actor's mailbox, which makes the mailbox the single
//! serialized boundary around the registry and directory.
//!
//! Work that may block is kept off the actor:
//! - The meeting-store existence check runs in [`SignalingHandle::join`]
//!   before the message is sent.
//! - `record_participant` is spawned after a successful join.
//! - Outbound events are handed to the [`EventSink`] with non-blocking sends
//!   once each transition completes.

use crate::errors::SignalError;
use crate::observability::metrics as prom;
use crate::signaling::{
    EventSink, JoinReceipt, Negotiation, Outbox, Participant, RelayOutcome,
    RelayScope, RoomLookup, SessionLifecycle, SignalingRouter, SignalingSnapshot,
};
use crate::store::MeetingStore;

use super::messages::SignalingMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};

use common::protocol::{ChatMessage, ClientEvent, JoinRoom};
use common::types::{ConnectionId, RoomId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the signaling mailbox.
const SIGNALING_CHANNEL_BUFFER: usize = 1024;

/// Handle to the `SignalingActor`.
#[derive(Clone)]
pub struct SignalingHandle {
    sender: mpsc::Sender<SignalingMessage>,
    cancel_token: CancellationToken,
    store: Arc<dyn MeetingStore>,
    mailbox: Arc<MailboxMonitor>,
}

impl std::fmt::Debug for SignalingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingHandle")
            .field("mailbox_depth", &self.mailbox.current_depth())
            .finish_non_exhaustive()
    }
}

impl SignalingHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(tokio::sync::oneshot::Sender<T>) -> SignalingMessage,
    ) -> Result<T, SignalError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|e| SignalError::Internal(format!("channel send failed: {e}")))?;
        self.mailbox.record_enqueue();

        rx.await
            .map_err(|e| SignalError::Internal(format!("response receive failed: {e}")))
    }

    /// Join `connection_id` to the room named in `request`.
    ///
    /// The meeting store is consulted first, outside the actor. Rejections
    /// are reported to the requester through the sink as well as returned.
    #[instrument(
        skip_all,
        name = "signal.join",
        fields(connection_id = %connection_id, room_id = %request.room_id)
    )]
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        request: JoinRoom,
    ) -> Result<JoinReceipt, SignalError> {
        let lookup = self.lookup_room(&request.room_id).await;

        let result = self
            .request(|respond_to| SignalingMessage::Join {
                connection_id,
                request,
                lookup,
                respond_to,
            })
            .await?;

        if let Ok(receipt) = &result {
            self.spawn_record_participant(&receipt.participant);
        }
        result
    }

    async fn lookup_room(&self, room_id: &RoomId) -> RoomLookup {
        let start = Instant::now();
        let exists = self.store.meeting_exists(room_id).await;
        prom::record_store_latency("meeting_exists", start.elapsed());

        match exists {
            Ok(true) => RoomLookup::Found,
            Ok(false) => RoomLookup::Missing,
            Err(e) => {
                warn!(
                    target: "signal.store",
                    room_id = %room_id,
                    error = %e,
                    "Meeting lookup failed"
                );
                prom::record_store_error("meeting_exists");
                RoomLookup::Failed(e.to_string())
            }
        }
    }

    fn spawn_record_participant(&self, participant: &Participant) {
        let store = Arc::clone(&self.store);
        let room_id = participant.room_id.clone();
        let name = participant.name.clone();
        let email = participant.email.clone();

        tokio::spawn(async move {
            let start = Instant::now();
            let result = store.record_participant(&room_id, &name, &email).await;
            prom::record_store_latency("record_participant", start.elapsed());

            if let Err(e) = result {
                warn!(
                    target: "signal.store",
                    room_id = %room_id,
                    error = %e,
                    "Failed to record participant"
                );
                prom::record_store_error("record_participant");
            }
        });
    }

    pub async fn relay(
        &self,
        connection_id: ConnectionId,
        negotiation: Negotiation,
    ) -> Result<RelayOutcome, SignalError> {
        self.request(|respond_to| SignalingMessage::Relay {
            connection_id,
            negotiation,
            respond_to,
        })
        .await
    }

    pub async fn chat(
        &self,
        connection_id: ConnectionId,
        message: ChatMessage,
    ) -> Result<RelayOutcome, SignalError> {
        self.request(|respond_to| SignalingMessage::Chat {
            connection_id,
            message,
            respond_to,
        })
        .await
    }

    /// Explicit leave. Returns the participant that left, if it was joined.
    pub async fn leave(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<Participant>, SignalError> {
        self.request(|respond_to| SignalingMessage::Leave {
            connection_id,
            respond_to,
        })
        .await
    }

    /// Transport closed. Safe to call more than once.
    pub async fn disconnect(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<Participant>, SignalError> {
        self.request(|respond_to| SignalingMessage::Disconnect {
            connection_id,
            respond_to,
        })
        .await
    }

    pub async fn members_of(&self, room_id: RoomId) -> Result<HashSet<ConnectionId>, SignalError> {
        self.request(|respond_to| SignalingMessage::MembersOf {
            room_id,
            respond_to,
        })
        .await
    }

    pub async fn lookup(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<Participant>, SignalError> {
        self.request(|respond_to| SignalingMessage::Lookup {
            connection_id,
            respond_to,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<SignalingSnapshot, SignalError> {
        self.request(|respond_to| SignalingMessage::GetSnapshot { respond_to })
            .await
    }

    /// Route one decoded client event.
    ///
    /// Rejections and drops are already reported (to the client or to the
    /// logs) by the time this returns; only a dead actor is an error.
    pub async fn handle_event(
        &self,
        connection_id: &ConnectionId,
        event: ClientEvent,
    ) -> Result<(), SignalError> {
        let name = event.name();
        let start = Instant::now();

        let result = match event {
            ClientEvent::JoinRoom(request) => {
                match self.join(connection_id.clone(), request).await {
                    Err(e @ SignalError::Internal(_)) => Err(e),
                    Ok(_) | Err(_) => Ok(()),
                }
            }
            ClientEvent::CallUser(call) => self
                .relay(connection_id.clone(), Negotiation::Offer(call))
                .await
                .map(drop),
            ClientEvent::MakeAnswer(answer) => self
                .relay(connection_id.clone(), Negotiation::Answer(answer))
                .await
                .map(drop),
            ClientEvent::IceCandidate(candidate) => self
                .relay(connection_id.clone(), Negotiation::Candidate(candidate))
                .await
                .map(drop),
            ClientEvent::ChatMessage(message) => {
                self.chat(connection_id.clone(), message).await.map(drop)
            }
            ClientEvent::LeaveRoom => self.leave(connection_id.clone()).await.map(drop),
        };

        prom::record_event_latency(name, start.elapsed());
        result
    }

    /// Token for actors that must stop when the signaling actor stops.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `SignalingActor` implementation.
pub struct SignalingActor {
    lifecycle: SessionLifecycle,
    router: SignalingRouter,
    receiver: mpsc::Receiver<SignalingMessage>,
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: Arc<MailboxMonitor>,
}

impl SignalingActor {
    /// Spawn the signaling actor.
    ///
    /// # Arguments
    ///
    /// * `sink` - Transport that receives outbound events
    /// * `store` - Meeting store consulted on join
    /// * `scope` - Whether relays must stay inside the sender's room
    /// * `cancel_token` - Root token; connection actors use children of it
    /// * `metrics` - Shared actor metrics
    pub fn spawn(
        sink: Arc<dyn EventSink>,
        store: Arc<dyn MeetingStore>,
        scope: RelayScope,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (SignalingHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(SIGNALING_CHANNEL_BUFFER);
        let mailbox = Arc::new(MailboxMonitor::new(ActorType::Signaling, "signaling"));

        let actor = Self {
            lifecycle: SessionLifecycle::new(scope),
            router: SignalingRouter::new(sink),
            receiver,
            cancel_token: cancel_token.clone(),
            metrics,
            mailbox: Arc::clone(&mailbox),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SignalingHandle {
            sender,
            cancel_token,
            store,
            mailbox,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "signal.actor.signaling")]
    async fn run(mut self) {
        info!(target: "signal.actor.signaling", "SignalingActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "signal.actor.signaling",
                        "SignalingActor received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.mailbox.record_dequeue();
                            self.mailbox.publish();
                            self.metrics.record_message_processed();
                        }
                        None => {
                            info!(
                                target: "signal.actor.signaling",
                                "SignalingActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        let snapshot = self.lifecycle.snapshot();
        info!(
            target: "signal.actor.signaling",
            participants = snapshot.participant_count(),
            rooms = snapshot.room_count(),
            messages_processed = self.mailbox.messages_processed(),
            "SignalingActor stopped"
        );
    }

    fn handle_message(&mut self, message: SignalingMessage) {
        match message {
            SignalingMessage::Join {
                connection_id,
                request,
                lookup,
                respond_to,
            } => {
                let result = self.handle_join(&connection_id, request, lookup);
                let _ = respond_to.send(result);
            }

            SignalingMessage::Relay {
                connection_id,
                negotiation,
                respond_to,
            } => {
                let outcome = self.handle_relay(&connection_id, negotiation);
                let _ = respond_to.send(outcome);
            }

            SignalingMessage::Chat {
                connection_id,
                message,
                respond_to,
            } => {
                let outcome = self.handle_chat(&connection_id, message);
                let _ = respond_to.send(outcome);
            }

            SignalingMessage::Leave {
                connection_id,
                respond_to,
            } => {
                let mut outbox = Outbox::new();
                let left = self.lifecycle.leave(&connection_id, &mut outbox);
                self.finish_departure(&connection_id, left.as_ref(), outbox, "leave");
                let _ = respond_to.send(left);
            }

            SignalingMessage::Disconnect {
                connection_id,
                respond_to,
            } => {
                let mut outbox = Outbox::new();
                let left = self.lifecycle.disconnect(&connection_id, &mut outbox);
                self.finish_departure(&connection_id, left.as_ref(), outbox, "disconnect");
                let _ = respond_to.send(left);
            }

            SignalingMessage::MembersOf {
                room_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.lifecycle.directory().members_of(&room_id));
            }

            SignalingMessage::Lookup {
                connection_id,
                respond_to,
            } => {
                let participant = self.lifecycle.registry().lookup(&connection_id).cloned();
                let _ = respond_to.send(participant);
            }

            SignalingMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.lifecycle.snapshot());
            }
        }
    }

    fn handle_join(
        &mut self,
        connection_id: &ConnectionId,
        request: JoinRoom,
        lookup: RoomLookup,
    ) -> Result<JoinReceipt, SignalError> {
        let mut outbox = Outbox::new();
        let result = self
            .lifecycle
            .join(connection_id, request, lookup, &mut outbox);
        self.router.dispatch(outbox);

        match &result {
            Ok(receipt) => {
                info!(
                    target: "signal.actor.signaling",
                    connection_id = %connection_id,
                    room_id = %receipt.participant.room_id,
                    existing = receipt.existing.len(),
                    "Participant joined"
                );
                prom::record_join("joined");
                self.publish_gauges();
            }
            Err(e) => {
                let outcome = match e {
                    SignalError::MeetingNotFound => "meeting_not_found",
                    SignalError::DuplicateJoin => "duplicate",
                    SignalError::SessionClosed => "closed",
                    SignalError::Store(_) => "store_error",
                    SignalError::Config(_) | SignalError::Internal(_) => "internal",
                };
                debug!(
                    target: "signal.actor.signaling",
                    connection_id = %connection_id,
                    outcome,
                    "Join rejected"
                );
                prom::record_join(outcome);
            }
        }
        result
    }

    fn handle_relay(
        &mut self,
        connection_id: &ConnectionId,
        negotiation: Negotiation,
    ) -> RelayOutcome {
        let kind = negotiation.kind();
        let mut outbox = Outbox::new();
        let outcome = self.lifecycle.relay(connection_id, negotiation, &mut outbox);
        self.router.dispatch(outbox);
        Self::record_relay(connection_id, kind, outcome);
        outcome
    }

    fn handle_chat(&mut self, connection_id: &ConnectionId, message: ChatMessage) -> RelayOutcome {
        let mut outbox = Outbox::new();
        let outcome = self.lifecycle.chat(connection_id, message, &mut outbox);
        self.router.dispatch(outbox);
        Self::record_relay(connection_id, "chat", outcome);
        outcome
    }

    fn record_relay(connection_id: &ConnectionId, kind: &str, outcome: RelayOutcome) {
        match outcome {
            RelayOutcome::Delivered(_) => prom::record_relay(kind, "delivered"),
            RelayOutcome::Dropped(reason) => {
                debug!(
                    target: "signal.actor.signaling",
                    connection_id = %connection_id,
                    kind,
                    reason = reason.as_str(),
                    "Relay dropped"
                );
                prom::record_relay(kind, "dropped");
                prom::record_delivery_dropped(reason.as_str());
            }
        }
    }

    fn finish_departure(
        &mut self,
        connection_id: &ConnectionId,
        left: Option<&Participant>,
        outbox: Outbox,
        how: &'static str,
    ) {
        let notified = self.router.dispatch(outbox);
        if let Some(participant) = left {
            info!(
                target: "signal.actor.signaling",
                connection_id = %connection_id,
                room_id = %participant.room_id,
                notified,
                how,
                "Participant left"
            );
            self.publish_gauges();
        }
    }

    fn publish_gauges(&self) {
        prom::set_participants_active(self.lifecycle.registry().len());
        prom::set_rooms_active(self.lifecycle.directory().room_count());
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
    use crate::signaling::Delivery;
    use crate::store::InMemoryMeetingStore;
    use common::protocol::{CallUser, ServerEvent, SignalBlob};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct CaptureSink {
        seen: Mutex<Vec<Delivery>>,
    }

    impl CaptureSink {
        fn take(&self) -> Vec<Delivery> {
            std::mem::take(&mut *self.seen.lock().unwrap())
        }
    }

    impl EventSink for CaptureSink {
        fn deliver(&self, target: &ConnectionId, event: ServerEvent) {
            self.seen.lock().unwrap().push(Delivery {
                target: target.clone(),
                event,
            });
        }
    }

    async fn setup() -> (SignalingHandle, Arc<CaptureSink>, Arc<InMemoryMeetingStore>, RoomId) {
        let sink = Arc::new(CaptureSink::default());
        let store = Arc::new(InMemoryMeetingStore::new());
        let room = store.create_meeting().await.unwrap();
        let (handle, _task) = SignalingActor::spawn(
            sink.clone(),
            store.clone(),
            RelayScope::Open,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        (handle, sink, store, room)
    }

    fn join_req(room: &RoomId, name: &str) -> JoinRoom {
        JoinRoom {
            room_id: room.clone(),
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_join_consults_store_and_records_participant() {
        let (handle, sink, store, room) = setup().await;

        let receipt = handle
            .join(ConnectionId::from("c1"), join_req(&room, "Alice"))
            .await
            .unwrap();
        assert!(receipt.existing.is_empty());
        assert_eq!(
            sink.take(),
            vec![Delivery {
                target: ConnectionId::from("c1"),
                event: ServerEvent::ExistingParticipants(vec![]),
            }]
        );

        // record_participant runs in the background
        let mut recorded = false;
        for _ in 0..50 {
            if store.meeting(&room).await.unwrap().users.len() == 1 {
                recorded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(recorded, "participant should be recorded in the meeting");
    }

    #[tokio::test]
    async fn test_unknown_room_is_reported() {
        let (handle, sink, _store, _room) = setup().await;

        let err = handle
            .join(ConnectionId::from("c1"), join_req(&RoomId::from("nope"), "Alice"))
            .await
            .unwrap_err();

        assert!(matches!(err, SignalError::MeetingNotFound));
        assert_eq!(sink.take()[0].event, ServerEvent::MeetingNotFound);
        assert!(handle.lookup(ConnectionId::from("c1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handle_event_routes_offer() {
        let (handle, sink, _store, room) = setup().await;
        handle
            .join(ConnectionId::from("c1"), join_req(&room, "Alice"))
            .await
            .unwrap();
        handle
            .join(ConnectionId::from("c2"), join_req(&room, "Bob"))
            .await
            .unwrap();
        sink.take();

        handle
            .handle_event(
                &ConnectionId::from("c2"),
                ClientEvent::CallUser(CallUser {
                    offer: SignalBlob::from_json(r#"{"sdp":"o"}"#).unwrap(),
                    target_connection_id: ConnectionId::from("c1"),
                }),
            )
            .await
            .unwrap();

        let deliveries = sink.take();
        assert_eq!(deliveries.len(), 1);
        assert!(matches!(
            &deliveries[0].event,
            ServerEvent::IncomingCall(call) if call.from_name == "Bob"
        ));
    }

    #[tokio::test]
    async fn test_handle_event_swallows_join_rejections() {
        let (handle, _sink, _store, _room) = setup().await;
        let result = handle
            .handle_event(
                &ConnectionId::from("c1"),
                ClientEvent::JoinRoom(join_req(&RoomId::from("nope"), "Alice")),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_requests_fail_after_cancel() {
        let sink = Arc::new(CaptureSink::default());
        let (handle, task) = SignalingActor::spawn(
            sink,
            Arc::new(InMemoryMeetingStore::new()),
            RelayScope::Open,
            CancellationToken::new(),
            ActorMetrics::new(),
        );

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("actor should stop")
            .unwrap();

        let err = handle.snapshot().await.unwrap_err();
        assert!(matches!(err, SignalError::Internal(_)));
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_token_follows_parent() {
        let (handle, _sink, _store, _room) = setup().await;
        let child = handle.child_token();
        assert!(!child.is_cancelled());

        handle.cancel();
        assert!(child.is_cancelled());
    }
}
