//! Signaling router.
//!
//! Deliveries are computed while the lifecycle boundary is held and collected
//! in an [`Outbox`]. The [`SignalingRouter`] hands them to the transport after
//! the transition has completed. Delivery is fire-and-forget: the sink never
//! reports back and nothing here awaits.

use crate::signaling::directory::RoomDirectory;
use crate::signaling::registry::ConnectionRegistry;
use common::protocol::ServerEvent;
use common::types::{ConnectionId, RoomId};
use std::sync::Arc;

/// One event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub target: ConnectionId,
    pub event: ServerEvent,
}

/// Why an event or relay was not delivered.
///
/// None of these are errors; they are expected under disconnect races or
/// misbehaving clients and are only logged and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Target connection is not registered.
    StaleTarget,
    /// Target is registered but not in the sender's room.
    CrossRoom,
    /// Sender has not joined a room.
    SenderNotJoined,
    /// Sender already left its room.
    SenderClosed,
    /// Chat addressed to a room other than the sender's.
    RoomMismatch,
}

impl DropReason {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DropReason::StaleTarget => "stale_target",
            DropReason::CrossRoom => "cross_room",
            DropReason::SenderNotJoined => "sender_not_joined",
            DropReason::SenderClosed => "sender_closed",
            DropReason::RoomMismatch => "room_mismatch",
        }
    }
}

/// Ordered batch of deliveries produced by one lifecycle transition.
#[derive(Debug, Default)]
pub struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the requesting connection directly.
    ///
    /// Used for responses to the requester, which may not be registered yet
    /// (`meeting-not-found`, `join-error`).
    pub fn reply(&mut self, target: &ConnectionId, event: ServerEvent) {
        self.deliveries.push(Delivery {
            target: target.clone(),
            event,
        });
    }

    /// Queue `event` for `target` if it is registered.
    ///
    /// Returns `false` when the target is stale and nothing was queued.
    pub fn unicast(
        &mut self,
        registry: &ConnectionRegistry,
        target: &ConnectionId,
        event: ServerEvent,
    ) -> bool {
        if !registry.contains(target) {
            return false;
        }
        self.reply(target, event);
        true
    }

    /// Queue one copy of `event` per member of `room_id` other than `exclude`.
    ///
    /// Returns the number of deliveries queued.
    pub fn broadcast_to_room_except(
        &mut self,
        directory: &RoomDirectory,
        room_id: &RoomId,
        exclude: &ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        let before = self.deliveries.len();
        for member in directory.iter_members(room_id) {
            if member != exclude {
                self.reply(member, event.clone());
            }
        }
        self.deliveries.len() - before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Consume the outbox, yielding deliveries in the order they were queued.
    #[must_use]
    pub fn into_deliveries(self) -> Vec<Delivery> {
        self.deliveries
    }
}

/// Transport-side receiver of outbound events.
///
/// Implementations must not block; the signaling actor calls this in its
/// message loop.
pub trait EventSink: Send + Sync {
    /// Hand `event` to the transport for `target`.
    fn deliver(&self, target: &ConnectionId, event: ServerEvent);
}

/// Flushes outboxes to the transport.
#[derive(Clone)]
pub struct SignalingRouter {
    sink: Arc<dyn EventSink>,
}

impl SignalingRouter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Hand every queued delivery to the sink, in order.
    pub fn dispatch(&self, outbox: Outbox) -> usize {
        let deliveries = outbox.into_deliveries();
        let count = deliveries.len();
        for delivery in deliveries {
            self.sink.deliver(&delivery.target, delivery.event);
        }
        count
    }
}

impl std::fmt::Debug for SignalingRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingRouter").finish_non_exhaustive()
    }
}
