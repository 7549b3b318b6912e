//! Signaling service error types.
//!
//! Error types map to the numeric codes carried by the `join-error` event.
//! Internal details are logged server-side but not exposed to clients.

use common::protocol::{JoinError, ServerEvent};
use thiserror::Error;

/// Signaling service error type.
///
/// Maps to client error codes:
/// - `MeetingNotFound`: `NOT_FOUND` (4)
/// - `DuplicateJoin`, `SessionClosed`: `CONFLICT` (5)
/// - `Store`, `Config`, `Internal`: `INTERNAL_ERROR` (6)
#[derive(Debug, Error)]
pub enum SignalError {
    /// Room is unknown to the meeting store.
    #[error("Meeting not found")]
    MeetingNotFound,

    /// Join requested on a connection that is already joined.
    #[error("Connection already joined a room")]
    DuplicateJoin,

    /// Join requested on a connection that already left its room.
    #[error("Session already closed")]
    SessionClosed,

    /// Meeting store lookup or write failed.
    #[error("Meeting store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (actor mailbox closed, response dropped).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<crate::config::ConfigError> for SignalError {
    fn from(err: crate::config::ConfigError) -> Self {
        SignalError::Config(err.to_string())
    }
}

impl SignalError {
    /// Returns the client error code for this error.
    pub fn error_code(&self) -> i32 {
        match self {
            SignalError::MeetingNotFound => 4,                            // NOT_FOUND
            SignalError::DuplicateJoin | SignalError::SessionClosed => 5, // CONFLICT
            SignalError::Store(_) | SignalError::Config(_) | SignalError::Internal(_) => {
                6 // INTERNAL_ERROR
            }
        }
    }

    /// Returns a client-safe error message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            SignalError::MeetingNotFound => "Meeting not found".to_string(),
            SignalError::DuplicateJoin => "Connection already joined a meeting".to_string(),
            SignalError::SessionClosed => "Connection already left the meeting".to_string(),
            SignalError::Store(_) | SignalError::Config(_) | SignalError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }

    /// Event reported to the requester when a join is refused.
    ///
    /// An unknown room has its own dedicated event; everything else is a
    /// generic `join-error`.
    pub fn to_event(&self) -> ServerEvent {
        match self {
            SignalError::MeetingNotFound => ServerEvent::MeetingNotFound,
            other => ServerEvent::JoinError(JoinError {
                code: other.error_code(),
                message: other.client_message(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(SignalError::MeetingNotFound.error_code(), 4);
        assert_eq!(SignalError::DuplicateJoin.error_code(), 5);
        assert_eq!(SignalError::SessionClosed.error_code(), 5);
        assert_eq!(SignalError::Store("timeout".to_string()).error_code(), 6);
        assert_eq!(SignalError::Config("bad".to_string()).error_code(), 6);
        assert_eq!(SignalError::Internal("gone".to_string()).error_code(), 6);
    }

    #[test]
    fn test_client_messages_hide_internal_details() {
        let store_err = SignalError::Store("connection refused at 10.0.0.7:27017".to_string());
        assert!(!store_err.client_message().contains("10.0.0.7"));
        assert_eq!(store_err.client_message(), "An internal error occurred");
    }

    #[test]
    fn test_to_event() {
        assert_eq!(
            SignalError::MeetingNotFound.to_event(),
            ServerEvent::MeetingNotFound
        );

        assert_eq!(
            SignalError::DuplicateJoin.to_event(),
            ServerEvent::JoinError(JoinError {
                code: 5,
                message: "Connection already joined a meeting".to_string(),
            })
        );

        let ServerEvent::JoinError(err) = SignalError::Store("down".to_string()).to_event() else {
            unreachable!("store failures are generic join errors");
        };
        assert_eq!(err.code, 6);
        assert!(!err.message.contains("down"));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", SignalError::Store("timeout".to_string())),
            "Meeting store error: timeout"
        );
        assert_eq!(
            format!("{}", SignalError::DuplicateJoin),
            "Connection already joined a room"
        );
    }
}
