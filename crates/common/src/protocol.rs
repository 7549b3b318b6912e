//! JSON signaling protocol.
//!
//! Every frame is a text message of the form
//! `{"event": "<kebab-case name>", "data": { ...camelCase fields... }}`.
//! Events without a payload omit `data`.
//!
//! Negotiation payloads (SDP offers/answers, ICE candidates) are carried as
//! [`SignalBlob`]s. The server never looks inside them; whatever JSON the
//! sender supplied is re-emitted to the target unchanged.

use crate::types::{ConnectionId, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Opaque negotiation payload owned by the endpoints.
///
/// Holds the sender's JSON text verbatim, so key order and number
/// formatting survive the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalBlob(Box<RawValue>);

impl SignalBlob {
    /// Wrap a JSON document without re-encoding it.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a single valid JSON value.
    pub fn from_json(json: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.into()).map(Self)
    }

    /// The JSON text exactly as the sender wrote it.
    #[must_use]
    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for SignalBlob {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl Eq for SignalBlob {}

// ----------------------------------------------------------------------------
// Client -> server
// ----------------------------------------------------------------------------

/// Events a client sends over its socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Ask to join a meeting room.
    JoinRoom(JoinRoom),
    /// SDP offer for one peer.
    CallUser(CallUser),
    /// SDP answer for one peer.
    MakeAnswer(MakeAnswer),
    /// ICE candidate for one peer.
    IceCandidate(IceCandidate),
    /// Text chat for the rest of the room.
    ChatMessage(ChatMessage),
    /// Explicit leave; the socket may stay open.
    LeaveRoom,
}

impl ClientEvent {
    /// Wire name of the event, used for logging and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::CallUser(_) => "call-user",
            ClientEvent::MakeAnswer(_) => "make-answer",
            ClientEvent::IceCandidate(_) => "ice-candidate",
            ClientEvent::ChatMessage(_) => "chat-message",
            ClientEvent::LeaveRoom => "leave-room",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub room_id: RoomId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUser {
    pub offer: SignalBlob,
    pub target_connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeAnswer {
    pub answer: SignalBlob,
    pub target_connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: SignalBlob,
    pub target_connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub room_id: RoomId,
    /// Accepted for compatibility but not trusted: relayed lines carry the
    /// name the sender registered with on `join-room`.
    pub sender_name: String,
    pub message: String,
}

// ----------------------------------------------------------------------------
// Server -> client
// ----------------------------------------------------------------------------

/// Events the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The requested room is unknown to the meeting store.
    MeetingNotFound,
    /// The join was refused for another reason.
    JoinError(JoinError),
    /// Everyone already in the room, sent once to a new joiner.
    ExistingParticipants(Vec<ParticipantSummary>),
    /// Someone joined the room.
    UserConnected(ParticipantSummary),
    /// Relayed SDP offer.
    IncomingCall(IncomingCall),
    /// Relayed SDP answer.
    AnswerMade(AnswerMade),
    /// Relayed ICE candidate.
    IceCandidate(RemoteIceCandidate),
    /// Someone left the room.
    UserDisconnected(UserDisconnected),
    /// Relayed chat line.
    ChatMessage(ChatLine),
}

impl ServerEvent {
    /// Wire name of the event, used for logging and metric labels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ServerEvent::MeetingNotFound => "meeting-not-found",
            ServerEvent::JoinError(_) => "join-error",
            ServerEvent::ExistingParticipants(_) => "existing-participants",
            ServerEvent::UserConnected(_) => "user-connected",
            ServerEvent::IncomingCall(_) => "incoming-call",
            ServerEvent::AnswerMade(_) => "answer-made",
            ServerEvent::IceCandidate(_) => "ice-candidate",
            ServerEvent::UserDisconnected(_) => "user-disconnected",
            ServerEvent::ChatMessage(_) => "chat-message",
        }
    }
}

/// Public identity of a joined participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub name: String,
    pub email: String,
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinError {
    /// Numeric error code (4 not found, 5 conflict, 6 internal).
    pub code: i32,
    /// Client-safe description.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    pub offer: SignalBlob,
    pub from: ConnectionId,
    pub from_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerMade {
    pub answer: SignalBlob,
    pub from: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIceCandidate {
    pub candidate: SignalBlob,
    pub from: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDisconnected {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatLine {
    pub sender_name: String,
    pub message: String,
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
    use serde_json::json;

    #[test]
    fn test_join_room_wire_format() {
        let raw = concat!(
            r#"{"event":"join-room","#,
            r#""data":{"roomId":"r1","name":"Alice","email":"a@x.com"}}"#
        );
        let event: ClientEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(
            event,
            ClientEvent::JoinRoom(JoinRoom {
                room_id: RoomId::from("r1"),
                name: "Alice".to_string(),
                email: "a@x.com".to_string(),
            })
        );
        assert_eq!(event.name(), "join-room");
    }

    #[test]
    fn test_leave_room_needs_no_payload() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"leave-room"}"#).unwrap();
        assert_eq!(event, ClientEvent::LeaveRoom);
    }

    #[test]
    fn test_offer_blob_is_carried_untouched() {
        let offer = concat!(
            r#"{"type":"offer","sdp":"v=0\r\no=- 46117 2 IN IP4 127.0.0.1\r\n","#,
            r#""n":18446744073709551616123,"f":1.10}"#
        );
        let raw = format!(
            r#"{{"event":"call-user","data":{{"offer":{offer},"targetConnectionId":"c1"}}}}"#
        );

        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        let ClientEvent::CallUser(call) = event else {
            panic!("expected call-user");
        };
        assert_eq!(call.offer.get(), offer);
        assert_eq!(call.target_connection_id, ConnectionId::from("c1"));

        let relayed = ServerEvent::IncomingCall(IncomingCall {
            offer: call.offer,
            from: ConnectionId::from("c2"),
            from_name: "Bob".to_string(),
        });
        let text = serde_json::to_string(&relayed).unwrap();
        let expected = format!(
            r#"{{"event":"incoming-call","data":{{"offer":{offer},"from":"c2","fromName":"Bob"}}}}"#
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_blob_whitespace_is_kept() {
        let raw = concat!(
            r#"{"event":"ice-candidate","#,
            r#""data":{"candidate": { "candidate" : "a=1" },"targetConnectionId":"c1"}}"#
        );
        let ClientEvent::IceCandidate(ice) = serde_json::from_str(raw).unwrap() else {
            panic!("expected ice-candidate");
        };
        assert_eq!(ice.candidate.get(), r#"{ "candidate" : "a=1" }"#);
    }

    #[test]
    fn test_blob_rejects_invalid_json() {
        assert!(SignalBlob::from_json("{not json").is_err());
        assert_eq!(SignalBlob::from_json(r#"{"a":1}"#).unwrap().get(), r#"{"a":1}"#);
    }

    #[test]
    fn test_server_event_wire_format() {
        let event = ServerEvent::ExistingParticipants(vec![ParticipantSummary {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            connection_id: ConnectionId::from("c1"),
        }]);

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "existing-participants",
                "data": [{"name": "Alice", "email": "a@x.com", "connectionId": "c1"}]
            })
        );

        assert_eq!(
            serde_json::to_value(ServerEvent::MeetingNotFound).unwrap(),
            json!({"event": "meeting-not-found"})
        );
    }

    #[test]
    fn test_incoming_call_field_names() {
        let event = ServerEvent::IncomingCall(IncomingCall {
            offer: SignalBlob::from_json(r#"{"sdp":"x"}"#).unwrap(),
            from: ConnectionId::from("c2"),
            from_name: "Bob".to_string(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "incoming-call");
        assert_eq!(value["data"]["from"], "c2");
        assert_eq!(value["data"]["fromName"], "Bob");
        assert_eq!(value["data"]["offer"], json!({"sdp": "x"}));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"event":"self-destruct","data":{}}"#);
        assert!(result.is_err());
    }
}
