//! Shared application state: the two services and the admin gate,
//! constructed once at startup around the selected storage backend and
//! cloned into every handler.

use std::sync::Arc;

use axum::http::HeaderMap;

use lib_registry::{AdminGate, MessageService, Storage, VoteService};

use crate::http_error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub votes: VoteService,
    pub messages: MessageService,
    pub admin: AdminGate,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, admin: AdminGate) -> Self {
        Self {
            votes: VoteService::new(store.clone()),
            messages: MessageService::new(store),
            admin,
        }
    }

    /// Checks the admin key attached as an `x-admin-key` header or an
    /// `adminKey` query parameter.
    pub fn require_admin(
        &self,
        headers: &HeaderMap,
        query_key: Option<&str>,
    ) -> Result<(), ApiError> {
        let provided = headers
            .get("x-admin-key")
            .and_then(|value| value.to_str().ok())
            .or(query_key);
        match provided {
            Some(key) if self.admin.authorize(key) => Ok(()),
            _ => Err(ApiError::admin_required()),
        }
    }
}
