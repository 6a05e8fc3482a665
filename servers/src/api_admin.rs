//! # Admin Login
//!
//! `POST /api/admin/login`: checks the submitted credentials against
//! the configured allow-list and, on success, hands back the shared
//! admin key the client attaches to privileged calls.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::http_error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    info!(
        "Admin login attempt: {} (password {})",
        email,
        if password.is_empty() { "missing" } else { "***" }
    );

    match state.admin.login(&email, &password) {
        Some(admin_key) => {
            info!("Admin login succeeded");
            Ok(Json(json!({ "success": true, "adminKey": admin_key })).into_response())
        }
        None => {
            info!("Admin login failed - invalid credentials");
            Ok((
                axum::http::StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "Invalid email or password" })),
            )
                .into_response())
        }
    }
}
