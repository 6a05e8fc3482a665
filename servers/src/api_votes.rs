//! # Vote Endpoints
//!
//! `GET/POST/DELETE /api/votes`, `GET/DELETE /api/votes/all` and
//! `GET /api/votes/check`. A repeated vote from the same browser id is
//! answered with 400 plus the current counts and the stored choice, so
//! the client can resync without a follow-up read.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, Extension, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use lib_registry::{VoteCounts, VoteOutcome};

use crate::http_error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePayload {
    #[serde(default)]
    pub vote_type: Option<String>,
    #[serde(default)]
    pub browser_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteQuery {
    #[serde(default)]
    pub browser_id: Option<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

/// Origin address of the caller, informational only. Proxies put the
/// real client first in `x-forwarded-for`.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded) = forwarded.to_str() {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Some(first.to_string());
                }
            }
        }
    }
    peer.map(|addr| addr.ip().to_string())
}

fn counts_body(counts: VoteCounts) -> serde_json::Value {
    json!({
        "success": true,
        "boy": counts.boy,
        "girl": counts.girl,
        "total": counts.total
    })
}

/// GET /api/votes
pub async fn get_counts(State(state): State<AppState>) -> Result<Json<VoteCounts>, ApiError> {
    let counts = state
        .votes
        .counts()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch votes"))?;
    Ok(Json(counts))
}

/// GET /api/votes/all
pub async fn list_votes(State(state): State<AppState>) -> Result<Response, ApiError> {
    let votes = state
        .votes
        .list_all()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to fetch votes"))?;
    Ok(Json(json!({ "votes": votes })).into_response())
}

/// POST /api/votes
pub async fn submit_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    // `into_make_service_with_connect_info` stores the peer address as
    // a request extension; absent in direct router tests.
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    Json(payload): Json<VotePayload>,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers, connect_info.map(|Extension(ConnectInfo(addr))| addr));
    let outcome = state
        .votes
        .submit(
            payload.vote_type.as_deref().unwrap_or(""),
            payload.browser_id.as_deref().unwrap_or(""),
            ip.as_deref(),
        )
        .await
        .map_err(|e| ApiError::from_service_setup(e, "Failed to submit vote"))?;

    match outcome {
        VoteOutcome::Accepted(counts) => Ok(Json(counts_body(counts)).into_response()),
        VoteOutcome::AlreadyVoted { counts, existing } => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "You have already voted",
                "boy": counts.boy,
                "girl": counts.girl,
                "total": counts.total,
                "voteType": existing
            })),
        )
            .into_response()),
    }
}

/// GET /api/votes/check
pub async fn check_vote(
    State(state): State<AppState>,
    Query(query): Query<VoteQuery>,
) -> Result<Response, ApiError> {
    let status = state
        .votes
        .check(query.browser_id.as_deref().unwrap_or(""))
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to check vote"))?;
    Ok(Json(json!({
        "hasVoted": status.has_voted,
        "voteType": status.vote_type
    }))
    .into_response())
}

/// DELETE /api/votes
pub async fn retract_vote(
    State(state): State<AppState>,
    Query(query): Query<VoteQuery>,
) -> Result<Response, ApiError> {
    let counts = state
        .votes
        .retract(query.browser_id.as_deref().unwrap_or(""))
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to clear vote"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Your vote has been cleared",
        "boy": counts.boy,
        "girl": counts.girl,
        "total": counts.total
    }))
    .into_response())
}

/// DELETE /api/votes/all (privileged)
pub async fn clear_votes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<VoteQuery>,
) -> Result<Response, ApiError> {
    state.require_admin(&headers, query.admin_key.as_deref())?;
    let counts = state
        .votes
        .clear_all()
        .await
        .map_err(|e| ApiError::from_service(e, "Failed to clear votes"))?;
    Ok(Json(json!({
        "success": true,
        "message": "All votes cleared",
        "boy": counts.boy,
        "girl": counts.girl,
        "total": counts.total
    }))
    .into_response())
}
