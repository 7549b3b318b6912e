//! Recording event sink.
//!
//! Stands in for the WebSocket transport when driving the signaling actor
//! directly. Every delivery is kept in dispatch order.
//!
//! # Example
//!
//! ```rust,ignore
//! let sink = RecordingSink::new();
//! let (handle, _task) = SignalingActor::spawn(sink.clone(), store, scope, token, metrics);
//!
//! handle.join(alice.clone(), request).await??;
//! assert_eq!(sink.events_for(&alice).len(), 1);
//! ```

use common::protocol::ServerEvent;
use common::types::ConnectionId;
use signal_service::signaling::{Delivery, EventSink};
use std::sync::{Arc, Mutex};

/// `EventSink` that records deliveries instead of writing to sockets.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    /// Create an empty sink, ready to hand to `SignalingActor::spawn`.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All deliveries so far, in dispatch order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Events delivered to `target`, in dispatch order.
    pub fn events_for(&self, target: &ConnectionId) -> Vec<ServerEvent> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|d| &d.target == target)
            .map(|d| d.event.clone())
            .collect()
    }

    /// Wire names of the events delivered to `target`.
    pub fn event_names_for(&self, target: &ConnectionId) -> Vec<&'static str> {
        self.events_for(target)
            .iter()
            .map(ServerEvent::name)
            .collect()
    }

    /// Drain and return everything recorded so far.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.deliveries.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, target: &ConnectionId, event: ServerEvent) {
        self.deliveries.lock().unwrap().push(Delivery {
            target: target.clone(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::UserDisconnected;

    #[test]
    fn test_records_in_order_and_filters_by_target() {
        let sink = RecordingSink::new();
        let alice = ConnectionId::from("alice");
        let bob = ConnectionId::from("bob");

        sink.deliver(&alice, ServerEvent::MeetingNotFound);
        sink.deliver(
            &bob,
            ServerEvent::UserDisconnected(UserDisconnected {
                connection_id: alice.clone(),
            }),
        );
        sink.deliver(&alice, ServerEvent::MeetingNotFound);

        assert_eq!(sink.len(), 3);
        assert_eq!(
            sink.event_names_for(&alice),
            vec!["meeting-not-found", "meeting-not-found"]
        );
        assert_eq!(sink.event_names_for(&bob), vec!["user-disconnected"]);
    }

    #[test]
    fn test_take_drains() {
        let sink = RecordingSink::new();
        sink.deliver(&ConnectionId::from("c1"), ServerEvent::MeetingNotFound);

        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
