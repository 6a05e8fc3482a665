//! # Registry HTTP Server
//!
//! Router assembly for the baby registry backend. The binary
//! (`server_registry`) resolves configuration, opens the storage
//! backend and serves the router built here; integration tests drive
//! the same router directly.

use axum::Json;
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

pub mod api_admin;
pub mod api_messages;
pub mod api_votes;
pub mod http_error;
pub mod state;

pub use state::AppState;

/// GET /health
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Baby Registry API Server", "status": "running" }))
}

/// Cross-origin policy: a concrete frontend origin gets credentialed
/// access; the `*` default allows any origin without credentials
/// (browsers refuse the combination, and tower-http rejects it too).
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-admin-key"),
        ]);

    if frontend_url == "*" {
        return layer.allow_origin(AllowOrigin::any());
    }
    match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            warn!("FRONTEND_URL {:?} is not a valid origin, allowing any", frontend_url);
            layer.allow_origin(AllowOrigin::any())
        }
    }
}

/// Builds the full application router.
pub fn build_router(app_state: AppState, frontend_url: &str) -> Router {
    Router::new()
        .route(
            "/api/votes",
            get(api_votes::get_counts)
                .post(api_votes::submit_vote)
                .delete(api_votes::retract_vote),
        )
        .route(
            "/api/votes/all",
            get(api_votes::list_votes).delete(api_votes::clear_votes),
        )
        .route("/api/votes/check", get(api_votes::check_vote))
        .route(
            "/api/messages",
            get(api_messages::list_messages)
                .post(api_messages::submit_message)
                .delete(api_messages::delete_messages),
        )
        .route("/api/messages/check", get(api_messages::check_message))
        .route("/api/messages/{id}", delete(api_messages::delete_message_by_id))
        .route("/api/admin/login", post(api_admin::login))
        .route("/health", get(health))
        .route("/", get(root))
        .layer(cors_layer(frontend_url))
        .with_state(app_state)
}
