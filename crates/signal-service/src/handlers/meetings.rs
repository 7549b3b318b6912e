//! Meeting HTTP handlers.
//!
//! - `GET /create-meeting` - Issue a new meeting ID
//! - `POST /join-meeting` - Check that a meeting ID exists before opening a socket
//!
//! Neither endpoint touches live membership; that only changes over the
//! WebSocket. Store errors are logged here and answered with a generic body.

use crate::observability::metrics as prom;
use crate::routes::AppState;
use crate::store::StoreError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::types::RoomId;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument};

/// Response body for `GET /create-meeting`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingResponse {
    pub meeting_id: RoomId,
}

/// Request body for `POST /join-meeting`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinMeetingRequest {
    /// Missing IDs are treated as unknown meetings rather than bad requests.
    #[serde(default)]
    pub meeting_id: Option<RoomId>,
}

/// Response body for a successful `POST /join-meeting`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinMeetingResponse {
    pub success: bool,
    pub message: String,
}

/// Error body shared by both endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures surfaced by the meeting endpoints.
#[derive(Debug)]
pub enum MeetingsError {
    /// `join-meeting` for an unknown ID.
    NotFound,
    /// `create-meeting` store failure.
    CreateFailed(StoreError),
    /// `join-meeting` store failure.
    LookupFailed(StoreError),
}

impl IntoResponse for MeetingsError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MeetingsError::NotFound => (StatusCode::NOT_FOUND, "Meeting ID not found."),
            MeetingsError::CreateFailed(err) => {
                // Log actual error server-side, return generic message to client
                error!(
                    target: "signal.handlers.meetings",
                    error = %err,
                    "Failed to create meeting"
                );
                prom::record_store_error("create_meeting");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create meeting.")
            }
            MeetingsError::LookupFailed(err) => {
                error!(target: "signal.handlers.meetings", error = %err, "Failed to check meeting");
                prom::record_store_error("meeting_exists");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error during join check.",
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// Handler for `GET /create-meeting`.
///
/// # Response
///
/// - 200 OK: `{"meetingId": "<uuid>"}`
/// - 500 Internal Server Error: store failure
#[instrument(skip_all, name = "signal.handlers.create_meeting")]
pub async fn create_meeting(
    State(state): State<AppState>,
) -> Result<Json<CreateMeetingResponse>, MeetingsError> {
    let start = Instant::now();
    let result = state.store.create_meeting().await;
    prom::record_store_latency("create_meeting", start.elapsed());

    let meeting_id = result.map_err(MeetingsError::CreateFailed)?;
    info!(target: "signal.handlers.meetings", meeting_id = %meeting_id, "Meeting created");

    Ok(Json(CreateMeetingResponse { meeting_id }))
}

/// Handler for `POST /join-meeting`.
///
/// # Response
///
/// - 200 OK: `{"success": true, "message": "Meeting found"}`
/// - 404 Not Found: unknown or missing meeting ID
/// - 500 Internal Server Error: store failure
#[instrument(skip_all, name = "signal.handlers.join_meeting")]
pub async fn join_meeting(
    State(state): State<AppState>,
    Json(request): Json<JoinMeetingRequest>,
) -> Result<Json<JoinMeetingResponse>, MeetingsError> {
    let Some(meeting_id) = request.meeting_id else {
        return Err(MeetingsError::NotFound);
    };

    let start = Instant::now();
    let exists = state.store.meeting_exists(&meeting_id).await;
    prom::record_store_latency("meeting_exists", start.elapsed());

    if !exists.map_err(MeetingsError::LookupFailed)? {
        return Err(MeetingsError::NotFound);
    }

    Ok(Json(JoinMeetingResponse {
        success: true,
        message: "Meeting found".to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        let response = MeetingsError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_failures_are_internal() {
        let response = MeetingsError::CreateFailed(StoreError::Unavailable("down".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = MeetingsError::LookupFailed(StoreError::Unavailable("down".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_join_request_tolerates_missing_id() {
        let request: JoinMeetingRequest = serde_json::from_str("{}").unwrap();
        assert!(request.meeting_id.is_none());

        let request: JoinMeetingRequest =
            serde_json::from_str(r#"{"meetingId":"abc"}"#).unwrap();
        assert_eq!(request.meeting_id, Some(RoomId::from("abc")));
    }
}
