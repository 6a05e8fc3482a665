//! # Message Endpoints
//!
//! The guestbook surface: `GET/POST/DELETE /api/messages`,
//! `GET /api/messages/check` and the privileged
//! `DELETE /api/messages/{id}`. Submission runs the service's three
//! duplicate-suppression layers; a suppressed duplicate is answered
//! with 400 and the earlier record embedded.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use lib_registry::{SubmitMessage, SubmitOutcome};

use crate::http_error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub browser_id: Option<String>,
    #[serde(default)]
    pub submission_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    #[serde(default)]
    pub browser_id: Option<String>,
    #[serde(default)]
    pub clear_all: Option<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

/// GET /api/messages
pub async fn list_messages(State(state): State<AppState>) -> Result<Response, ApiError> {
    let messages = state
        .messages
        .list()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch messages"))?;
    Ok(Json(json!({ "messages": messages })).into_response())
}

/// POST /api/messages
pub async fn submit_message(
    State(state): State<AppState>,
    Json(payload): Json<MessagePayload>,
) -> Result<Response, ApiError> {
    let (Some(name), Some(message)) = (payload.name, payload.message) else {
        return Err(ApiError::BadRequest(
            "Name and message are required".to_string(),
        ));
    };

    let outcome = state
        .messages
        .submit(SubmitMessage {
            name,
            message,
            browser_id: payload.browser_id.unwrap_or_default(),
            submission_id: payload.submission_id,
        })
        .await
        .map_err(|e| ApiError::from_service_setup(e, "Failed to submit message"))?;

    match outcome {
        SubmitOutcome::Stored(record) | SubmitOutcome::Replayed(record) => {
            Ok(Json(json!({ "success": true, "message": record })).into_response())
        }
        SubmitOutcome::Duplicate(earlier) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Duplicate message detected. Please wait a moment before submitting again.",
                "message": {
                    "id": earlier.id,
                    "name": earlier.name,
                    "message": earlier.message,
                    "timestamp": earlier.created_at
                }
            })),
        )
            .into_response()),
    }
}

/// GET /api/messages/check
pub async fn check_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Response, ApiError> {
    let status = state
        .messages
        .check(query.browser_id.as_deref().unwrap_or(""))
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to check message"))?;
    Ok(Json(json!({
        "hasMessage": status.has_message,
        "message": status.message
    }))
    .into_response())
}

/// DELETE /api/messages — self retraction, or the privileged bulk
/// clear when called with `clearAll=true`.
pub async fn delete_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MessageQuery>,
) -> Result<Response, ApiError> {
    if query.clear_all.as_deref() == Some("true") {
        state.require_admin(&headers, query.admin_key.as_deref())?;
        state
            .messages
            .clear_all()
            .await
            .map_err(|e| ApiError::from_service(e, "Failed to clear messages"))?;
        return Ok(Json(json!({
            "success": true,
            "message": "All messages cleared"
        }))
        .into_response());
    }

    state
        .messages
        .retract(query.browser_id.as_deref().unwrap_or(""))
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to clear message"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Your message has been cleared"
    }))
    .into_response())
}

/// DELETE /api/messages/{id} (privileged)
pub async fn delete_message_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<MessageQuery>,
) -> Result<Response, ApiError> {
    state.require_admin(&headers, query.admin_key.as_deref())?;
    state
        .messages
        .delete_by_id(id)
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to delete message"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Message deleted successfully"
    }))
    .into_response())
}
