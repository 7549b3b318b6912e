//! WebSocket endpoint.
//!
//! One task per socket reads client frames and forwards decoded events to the
//! signaling actor, one at a time and in arrival order. Writes go through the
//! socket's `ConnectionActor`, which is attached to [`ConnectionSinks`] before
//! the first event is forwarded.
//!
//! [`ConnectionSinks`]: super::ConnectionSinks

use crate::actors::{ActorType, ConnectionActor};
use crate::routes::AppState;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use common::protocol::ClientEvent;
use common::types::ConnectionId;
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

/// Handler for `GET /ws`.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let max_message_bytes = state.config.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(state, socket))
}

#[instrument(skip_all, name = "signal.transport.ws", fields(connection_id = tracing::field::Empty))]
async fn handle_socket(state: AppState, socket: WebSocket) {
    let connection_id = ConnectionId::generate();
    tracing::Span::current().record("connection_id", connection_id.as_str());

    let (sink, mut stream) = socket.split();
    let cancel_token = state.signaling.child_token();

    let (writer, writer_task) = ConnectionActor::spawn(
        connection_id.clone(),
        sink,
        state.config.connection_buffer,
        cancel_token.clone(),
        state.actor_metrics.clone(),
    );
    state.sinks.attach(writer.clone());
    state.actor_metrics.connection_opened();

    info!(
        target: "signal.transport.ws",
        connection_id = %connection_id,
        "Connection opened"
    );

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!(
                    target: "signal.transport.ws",
                    connection_id = %connection_id,
                    "Reader cancelled"
                );
                break;
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !forward_text(&state, &connection_id, &text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary and control frames carry no signaling
                    }
                    Some(Err(e)) => {
                        debug!(
                            target: "signal.transport.ws",
                            connection_id = %connection_id,
                            error = %e,
                            "Socket read failed"
                        );
                        break;
                    }
                }
            }
        }
    }

    // Writer stays attached until the disconnect has been processed
    if let Err(e) = state.signaling.disconnect(connection_id.clone()).await {
        warn!(
            target: "signal.transport.ws",
            connection_id = %connection_id,
            error = %e,
            "Disconnect not processed"
        );
    }

    state.sinks.detach(&connection_id);
    writer.cancel();
    if let Err(e) = writer_task.await {
        if e.is_panic() {
            state.actor_metrics.record_panic(ActorType::Connection);
        }
        warn!(
            target: "signal.transport.ws",
            connection_id = %connection_id,
            error = %e,
            "Connection writer task failed"
        );
    }
    state.actor_metrics.connection_closed();

    info!(
        target: "signal.transport.ws",
        connection_id = %connection_id,
        "Connection closed"
    );
}

/// Decode one text frame and hand it to the signaling actor.
///
/// Returns `false` when the signaling actor is gone and the socket should be
/// closed. Frames that do not decode are ignored.
async fn forward_text(state: &AppState, connection_id: &ConnectionId, text: &str) -> bool {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(
                target: "signal.transport.ws",
                connection_id = %connection_id,
                error = %e,
                "Ignoring malformed client frame"
            );
            return true;
        }
    };

    match state.signaling.handle_event(connection_id, event).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                target: "signal.transport.ws",
                connection_id = %connection_id,
                error = %e,
                "Signaling unavailable, closing socket"
            );
            false
        }
    }
}
