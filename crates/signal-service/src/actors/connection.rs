//! `ConnectionActor` - writer for one WebSocket.
//!
//! Each `ConnectionActor`:
//! - Owns the write half of exactly one socket
//! - Serializes [`ServerEvent`]s to JSON text frames in mailbox order
//! - Sends a close frame when cancelled
//!
//! The read half stays with the transport task, which forwards client events
//! to the signaling actor. Outbound events reach this actor through
//! [`ConnectionActorHandle::try_send`], which never waits: a full mailbox
//! means the client is not reading and the event is dropped.

use super::messages::ConnectionMessage;
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use crate::errors::SignalError;

use axum::extract::ws::{CloseFrame, Message};
use common::protocol::ServerEvent;
use common::types::ConnectionId;
use futures::{Sink, SinkExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// WebSocket close code for a normal server-initiated close (going away).
const CLOSE_GOING_AWAY: u16 = 1001;

/// Why [`ConnectionActorHandle::try_send`] did not enqueue an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Mailbox at capacity.
    Full,
    /// Actor has exited.
    Closed,
}

impl SendFailure {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SendFailure::Full => "mailbox_full",
            SendFailure::Closed => "connection_closed",
        }
    }
}

/// Handle to a `ConnectionActor`.
#[derive(Clone, Debug)]
pub struct ConnectionActorHandle {
    sender: mpsc::Sender<ConnectionMessage>,
    cancel_token: CancellationToken,
    connection_id: ConnectionId,
    mailbox: Arc<MailboxMonitor>,
}

impl ConnectionActorHandle {
    #[must_use]
    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    /// Queue `event` for the socket without waiting.
    pub fn try_send(&self, event: ServerEvent) -> Result<(), SendFailure> {
        match self.sender.try_send(ConnectionMessage::Send { event }) {
            Ok(()) => {
                self.mailbox.record_enqueue();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.mailbox.record_drop();
                Err(SendFailure::Full)
            }
            Err(TrySendError::Closed(_)) => Err(SendFailure::Closed),
        }
    }

    /// Resolves once every event queued before it has been written.
    pub async fn ping(&self) -> Result<(), SignalError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        // Counted before the send so the actor's dequeue can never run first
        self.mailbox.record_enqueue();
        if let Err(e) = self
            .sender
            .send(ConnectionMessage::Ping { respond_to: tx })
            .await
        {
            self.mailbox.record_dequeue();
            return Err(SignalError::Internal(format!("channel send failed: {e}")));
        }

        rx.await
            .map_err(|e| SignalError::Internal(format!("response receive failed: {e}")))
    }

    /// Stop the actor; it sends a close frame on the way out.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `ConnectionActor` implementation.
pub struct ConnectionActor<S> {
    connection_id: ConnectionId,
    /// Write half of the socket.
    sink: S,
    receiver: mpsc::Receiver<ConnectionMessage>,
    /// Child of the server's root token.
    cancel_token: CancellationToken,
    metrics: Arc<ActorMetrics>,
    mailbox: Arc<MailboxMonitor>,
}

impl<S> ConnectionActor<S>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: std::fmt::Display,
{
    /// Spawn a connection actor writing to `sink`.
    ///
    /// `buffer` bounds the outbound mailbox.
    pub fn spawn(
        connection_id: ConnectionId,
        sink: S,
        buffer: usize,
        cancel_token: CancellationToken,
        metrics: Arc<ActorMetrics>,
    ) -> (ConnectionActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let mailbox = Arc::new(MailboxMonitor::new(
            ActorType::Connection,
            connection_id.as_str(),
        ));

        let actor = Self {
            connection_id: connection_id.clone(),
            sink,
            receiver,
            cancel_token: cancel_token.clone(),
            metrics,
            mailbox: Arc::clone(&mailbox),
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = ConnectionActorHandle {
            sender,
            cancel_token,
            connection_id,
            mailbox,
        };

        (handle, task_handle)
    }

    #[instrument(
        skip_all,
        name = "signal.actor.connection",
        fields(connection_id = %self.connection_id)
    )]
    async fn run(mut self) {
        debug!(
            target: "signal.actor.connection",
            connection_id = %self.connection_id,
            "ConnectionActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "signal.actor.connection",
                        connection_id = %self.connection_id,
                        "ConnectionActor received cancellation signal"
                    );
                    self.send_close().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            let keep_running = self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                            self.metrics.record_message_processed();

                            if !keep_running {
                                break;
                            }
                        }
                        None => {
                            debug!(
                                target: "signal.actor.connection",
                                connection_id = %self.connection_id,
                                "ConnectionActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        debug!(
            target: "signal.actor.connection",
            connection_id = %self.connection_id,
            messages_processed = self.mailbox.messages_processed(),
            messages_dropped = self.mailbox.messages_dropped(),
            "ConnectionActor stopped"
        );
    }

    /// Returns false once the socket can no longer be written.
    async fn handle_message(&mut self, message: ConnectionMessage) -> bool {
        match message {
            ConnectionMessage::Send { event } => self.write_event(&event).await,
            ConnectionMessage::Ping { respond_to } => {
                let _ = respond_to.send(());
                true
            }
        }
    }

    async fn write_event(&mut self, event: &ServerEvent) -> bool {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                // Only reachable if a relayed blob cannot be re-encoded
                warn!(
                    target: "signal.actor.connection",
                    connection_id = %self.connection_id,
                    event = event.name(),
                    error = %e,
                    "Failed to encode event, skipping"
                );
                return true;
            }
        };

        if let Err(e) = self.sink.send(Message::Text(text)).await {
            debug!(
                target: "signal.actor.connection",
                connection_id = %self.connection_id,
                error = %e,
                "Socket write failed, stopping writer"
            );
            return false;
        }
        true
    }

    async fn send_close(&mut self) {
        let frame = CloseFrame {
            code: CLOSE_GOING_AWAY,
            reason: "server shutting down".into(),
        };
        if let Err(e) = self.sink.send(Message::Close(Some(frame))).await {
            debug!(
                target: "signal.actor.connection",
                connection_id = %self.connection_id,
                error = %e,
                "Close frame not sent"
            );
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
    use common::protocol::UserDisconnected;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;
    use std::time::Duration;

    fn spawn_with_buffer(
        buffer: usize,
    ) -> (
        ConnectionActorHandle,
        JoinHandle<()>,
        fmpsc::UnboundedReceiver<Message>,
    ) {
        let (tx, rx) = fmpsc::unbounded::<Message>();
        let (handle, task) = ConnectionActor::spawn(
            ConnectionId::from("c1"),
            tx,
            buffer,
            CancellationToken::new(),
            ActorMetrics::new(),
        );
        (handle, task, rx)
    }

    fn left(id: &str) -> ServerEvent {
        ServerEvent::UserDisconnected(UserDisconnected {
            connection_id: ConnectionId::from(id),
        })
    }

    #[tokio::test]
    async fn test_events_are_written_as_json_text() {
        let (handle, _task, mut rx) = spawn_with_buffer(8);

        handle.try_send(ServerEvent::MeetingNotFound).unwrap();
        handle.try_send(left("c2")).unwrap();
        handle.ping().await.unwrap();

        let Some(Message::Text(first)) = rx.next().await else {
            panic!("expected text frame");
        };
        assert_eq!(first, r#"{"event":"meeting-not-found"}"#);

        let Some(Message::Text(second)) = rx.next().await else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&second).unwrap();
        assert_eq!(value["event"], "user-disconnected");
        assert_eq!(value["data"]["connectionId"], "c2");
    }

    #[tokio::test]
    async fn test_cancel_sends_close_frame() {
        let (handle, task, mut rx) = spawn_with_buffer(8);

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("actor should stop")
            .unwrap();

        let Some(Message::Close(Some(frame))) = rx.next().await else {
            panic!("expected close frame");
        };
        assert_eq!(frame.code, CLOSE_GOING_AWAY);
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_try_send_after_exit_reports_closed() {
        let (handle, task, rx) = spawn_with_buffer(8);
        drop(rx);

        // Writing to a dropped receiver fails and stops the writer
        handle.try_send(left("c2")).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("actor should stop")
            .unwrap();

        assert_eq!(handle.try_send(left("c3")), Err(SendFailure::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_mailbox_drops_instead_of_waiting() {
        let (tx, _rx) = fmpsc::channel::<Message>(0);
        // Bounded futures channel with no reader: the first write parks the
        // actor, so the mailbox fills up behind it.
        let (handle, _task) = ConnectionActor::spawn(
            ConnectionId::from("c1"),
            tx,
            1,
            CancellationToken::new(),
            ActorMetrics::new(),
        );

        let mut full = false;
        for i in 0..16 {
            if handle.try_send(left(&format!("c{i}"))) == Err(SendFailure::Full) {
                full = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(full, "a stalled socket must not block senders");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_counts_toward_mailbox_depth() {
        let (tx, _rx) = fmpsc::channel::<Message>(0);
        let (handle, _task) = ConnectionActor::spawn(
            ConnectionId::from("c1"),
            tx,
            8,
            CancellationToken::new(),
            ActorMetrics::new(),
        );

        // Park the writer on a socket nobody reads
        handle.try_send(left("c2")).unwrap();
        handle.try_send(left("c3")).unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let parked = handle.mailbox.current_depth();

        let pinger = handle.clone();
        tokio::spawn(async move { pinger.ping().await });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(handle.mailbox.current_depth(), parked + 1);
    }

    #[tokio::test]
    async fn test_mailbox_drains_to_zero_after_ping() {
        let (handle, _task, _rx) = spawn_with_buffer(8);

        handle.try_send(left("c2")).unwrap();
        handle.ping().await.unwrap();
        handle.ping().await.unwrap();

        // The last ping's dequeue lands just after its reply
        tokio::time::timeout(Duration::from_secs(1), async {
            while handle.mailbox.current_depth() != 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("mailbox should drain");
        assert!(handle.mailbox.peak_depth() >= 1);
    }

    #[test]
    fn test_send_failure_labels() {
        assert_eq!(SendFailure::Full.as_str(), "mailbox_full");
        assert_eq!(SendFailure::Closed.as_str(), "connection_closed");
    }
}
