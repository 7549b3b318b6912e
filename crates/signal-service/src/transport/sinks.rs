//! Production [`EventSink`]: connection ID -> `ConnectionActor` handle.

use crate::actors::ConnectionActorHandle;
use crate::observability::metrics as prom;
use crate::signaling::EventSink;
use common::protocol::ServerEvent;
use common::types::ConnectionId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Live socket writers, keyed by connection.
///
/// Attach happens before the socket's first event is forwarded and detach
/// after its disconnect has been processed, so every registered participant
/// has a writer.
#[derive(Debug, Default)]
pub struct ConnectionSinks {
    handles: Mutex<HashMap<ConnectionId, ConnectionActorHandle>>,
}

impl ConnectionSinks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, handle: ConnectionActorHandle) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.connection_id().clone(), handle);
    }

    /// Remove and return the writer for `connection_id`.
    pub fn detach(&self, connection_id: &ConnectionId) -> Option<ConnectionActorHandle> {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for ConnectionSinks {
    fn deliver(&self, target: &ConnectionId, event: ServerEvent) {
        let handle = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned();

        let Some(handle) = handle else {
            debug!(
                target: "signal.transport.ws",
                connection_id = %target,
                event = event.name(),
                "No writer attached, dropping event"
            );
            prom::record_delivery_dropped("not_attached");
            return;
        };

        let name = event.name();
        if let Err(failure) = handle.try_send(event) {
            debug!(
                target: "signal.transport.ws",
                connection_id = %target,
                event = name,
                reason = failure.as_str(),
                "Event not queued"
            );
            prom::record_delivery_dropped(failure.as_str());
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
    use crate::actors::{ActorMetrics, ConnectionActor};
    use axum::extract::ws::Message;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    fn writer(id: &str) -> (ConnectionActorHandle, fmpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = fmpsc::unbounded::<Message>();
        let (handle, _task) = ConnectionActor::spawn(
            ConnectionId::from(id),
            tx,
            8,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        (handle, rx)
    }

    #[tokio::test]
    async fn test_deliver_reaches_attached_writer() {
        let sinks = ConnectionSinks::new();
        let (handle, mut rx) = writer("c1");
        sinks.attach(handle.clone());

        sinks.deliver(&ConnectionId::from("c1"), ServerEvent::MeetingNotFound);
        handle.ping().await.unwrap();

        let Some(Message::Text(text)) = rx.next().await else {
            panic!("expected text frame");
        };
        assert!(text.contains("meeting-not-found"));
    }

    #[tokio::test]
    async fn test_deliver_to_unknown_connection_is_silent() {
        let sinks = ConnectionSinks::new();
        sinks.deliver(&ConnectionId::from("ghost"), ServerEvent::MeetingNotFound);
        assert!(sinks.is_empty());
    }

    #[tokio::test]
    async fn test_detach() {
        let sinks = ConnectionSinks::new();
        let (handle, _rx) = writer("c1");
        sinks.attach(handle);
        assert_eq!(sinks.len(), 1);

        let detached = sinks.detach(&ConnectionId::from("c1")).unwrap();
        assert_eq!(detached.connection_id(), &ConnectionId::from("c1"));
        assert!(sinks.detach(&ConnectionId::from("c1")).is_none());
        assert!(sinks.is_empty());
    }
}
