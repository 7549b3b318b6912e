//! Pre-configured test data for signaling tests.
//!
//! Provides a participant builder that produces the client events a real
//! browser would send.

use common::protocol::{
    CallUser, ChatMessage, ClientEvent, IceCandidate, JoinRoom, MakeAnswer, SignalBlob,
};
use common::types::{ConnectionId, RoomId};

/// Test participant fixture.
#[derive(Debug, Clone)]
pub struct TestParticipant {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl TestParticipant {
    /// Create a participant; the email is derived from the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let email = format!("{}@example.com", name.to_lowercase());
        Self { name, email }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Join payload for `room_id`.
    #[must_use]
    pub fn join_request(&self, room_id: &RoomId) -> JoinRoom {
        JoinRoom {
            room_id: room_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    /// `join-room` event for `room_id`.
    #[must_use]
    pub fn join(&self, room_id: &RoomId) -> ClientEvent {
        ClientEvent::JoinRoom(self.join_request(room_id))
    }

    /// `chat-message` event claiming this participant's name.
    #[must_use]
    pub fn chat(&self, room_id: &RoomId, message: &str) -> ClientEvent {
        ClientEvent::ChatMessage(ChatMessage {
            room_id: room_id.clone(),
            sender_name: self.name.clone(),
            message: message.to_string(),
        })
    }
}

/// A minimal SDP offer blob.
#[must_use]
pub fn sdp_offer() -> SignalBlob {
    SignalBlob::from_json(r#"{"type":"offer","sdp":"v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n"}"#)
        .unwrap()
}

/// A minimal SDP answer blob.
#[must_use]
pub fn sdp_answer() -> SignalBlob {
    SignalBlob::from_json(r#"{"type":"answer","sdp":"v=0\r\no=- 2 2 IN IP4 0.0.0.0\r\n"}"#)
        .unwrap()
}

/// A host ICE candidate blob.
#[must_use]
pub fn ice_candidate() -> SignalBlob {
    SignalBlob::from_json(concat!(
        r#"{"candidate":"candidate:1 1 udp 2122260223 192.0.2.10 54321 typ host","#,
        r#""sdpMid":"0","sdpMLineIndex":0}"#
    ))
    .unwrap()
}

/// `call-user` event carrying [`sdp_offer`].
#[must_use]
pub fn call(target: &ConnectionId) -> ClientEvent {
    ClientEvent::CallUser(CallUser {
        offer: sdp_offer(),
        target_connection_id: target.clone(),
    })
}

/// `make-answer` event carrying [`sdp_answer`].
#[must_use]
pub fn answer(target: &ConnectionId) -> ClientEvent {
    ClientEvent::MakeAnswer(MakeAnswer {
        answer: sdp_answer(),
        target_connection_id: target.clone(),
    })
}

/// `ice-candidate` event carrying [`ice_candidate`].
#[must_use]
pub fn candidate(target: &ConnectionId) -> ClientEvent {
    ClientEvent::IceCandidate(IceCandidate {
        candidate: ice_candidate(),
        target_connection_id: target.clone(),
    })
}
