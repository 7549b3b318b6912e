//! Message types for actor communication.
//!
//! Request-reply pairs use `tokio::sync::oneshot`. The signaling actor replies
//! only after the transition's deliveries have been handed to the sink, so a
//! caller that awaits the reply can rely on them being queued.

use crate::errors::SignalError;
use crate::signaling::{
    JoinReceipt, Negotiation, Participant, RelayOutcome, RoomLookup, SignalingSnapshot,
};
use common::protocol::{ChatMessage, JoinRoom, ServerEvent};
use common::types::{ConnectionId, RoomId};
use std::collections::HashSet;
use tokio::sync::oneshot;

/// Messages sent to `SignalingActor`.
#[derive(Debug)]
pub enum SignalingMessage {
    /// Join a room. The store lookup has already happened.
    Join {
        connection_id: ConnectionId,
        request: JoinRoom,
        lookup: RoomLookup,
        respond_to: oneshot::Sender<Result<JoinReceipt, SignalError>>,
    },

    /// Relay an offer, answer or ICE candidate.
    Relay {
        connection_id: ConnectionId,
        negotiation: Negotiation,
        respond_to: oneshot::Sender<RelayOutcome>,
    },

    /// Broadcast a chat line to the sender's room.
    Chat {
        connection_id: ConnectionId,
        message: ChatMessage,
        respond_to: oneshot::Sender<RelayOutcome>,
    },

    /// Explicit leave; the socket stays open.
    Leave {
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<Option<Participant>>,
    },

    /// Socket closed.
    Disconnect {
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<Option<Participant>>,
    },

    MembersOf {
        room_id: RoomId,
        respond_to: oneshot::Sender<HashSet<ConnectionId>>,
    },

    Lookup {
        connection_id: ConnectionId,
        respond_to: oneshot::Sender<Option<Participant>>,
    },

    GetSnapshot {
        respond_to: oneshot::Sender<SignalingSnapshot>,
    },
}

/// Messages sent to `ConnectionActor`.
#[derive(Debug)]
pub enum ConnectionMessage {
    /// Write an event to the socket.
    Send { event: ServerEvent },

    /// Liveness check; answered once every earlier `Send` has been written.
    Ping { respond_to: oneshot::Sender<()> },
}
