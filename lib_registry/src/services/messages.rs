//! # Message Service
//!
//! One guestbook message per identity, with three independent
//! duplicate-suppression layers applied in order:
//!
//! 1. identity upsert — a resubmission by the same browser id updates
//!    the existing record in place instead of creating a new one;
//! 2. a 10-second window in which identical trimmed (name, message)
//!    pairs are treated as one accidental double-submit;
//! 3. submission-token replay — a request carrying an already-seen
//!    token returns the stored record, independent of the window.
//!
//! Each layer catches a different client failure mode (editing, double
//! click, network retry), which is why all three coexist.

use std::sync::Arc;

use tracing::info;

use crate::error::ServiceError;
use crate::records::MessageRecord;
use crate::storage::Storage;

/// How long two identical (name, message) submissions count as one.
pub const DUPLICATE_WINDOW_SECONDS: i64 = 10;

fn duplicate_window() -> chrono::Duration {
    chrono::Duration::seconds(DUPLICATE_WINDOW_SECONDS)
}

/// A message submission as received from the client, untrimmed.
#[derive(Debug, Clone)]
pub struct SubmitMessage {
    pub name: String,
    pub message: String,
    pub browser_id: String,
    pub submission_id: Option<String>,
}

/// Result of a message submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Created, or updated in place for a returning identity.
    Stored(MessageRecord),
    /// Suppressed by the 10-second window; carries the earlier record
    /// so the caller can resync.
    Duplicate(MessageRecord),
    /// A replay of an already-processed submission token; carries the
    /// stored record. Reported as success, not as a conflict.
    Replayed(MessageRecord),
}

/// Result of a has-message lookup.
#[derive(Debug, Clone)]
pub struct MessageStatus {
    pub has_message: bool,
    pub message: Option<MessageRecord>,
}

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn Storage>,
}

impl MessageService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    fn require_browser_id(browser_id: &str) -> Result<(), ServiceError> {
        if browser_id.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Browser ID is required".to_string(),
            ));
        }
        Ok(())
    }

    /// All messages, newest first. Fresh query each call, no pagination.
    pub async fn list(&self) -> Result<Vec<MessageRecord>, ServiceError> {
        Ok(self.store.list_messages().await?)
    }

    pub async fn check(&self, browser_id: &str) -> Result<MessageStatus, ServiceError> {
        Self::require_browser_id(browser_id)?;
        let message = self.store.find_message(browser_id).await?;
        Ok(MessageStatus {
            has_message: message.is_some(),
            message,
        })
    }

    /// Submits (or resubmits) a message, running the three
    /// duplicate-suppression layers in order.
    pub async fn submit(&self, input: SubmitMessage) -> Result<SubmitOutcome, ServiceError> {
        Self::require_browser_id(&input.browser_id)?;
        let name = input.name.trim();
        let message = input.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Name and message cannot be empty".to_string(),
            ));
        }
        let browser_id = input.browser_id.as_str();
        let submission_id = input.submission_id.as_deref();

        // Layer 1: the identity already owns a message, update in place.
        if self.store.find_message(browser_id).await?.is_some() {
            info!("Browser {} already has a message, updating it", browser_id);
            let updated = self
                .store
                .upsert_message(browser_id, name, message, submission_id)
                .await?;
            return Ok(SubmitOutcome::Stored(updated));
        }

        // Layer 2: identical (name, message) landed moments ago.
        if let Some(earlier) = self
            .store
            .find_recent_duplicate(name, message, duplicate_window())
            .await?
        {
            info!("Duplicate message detected from {} within {} seconds", name, DUPLICATE_WINDOW_SECONDS);
            return Ok(SubmitOutcome::Duplicate(earlier));
        }

        // Layer 3: this exact submission was already processed.
        if let Some(submission_id) = submission_id {
            if let Some(stored) = self.store.find_message_by_submission(submission_id).await? {
                info!("Message with submission ID {} already exists", submission_id);
                return Ok(SubmitOutcome::Replayed(stored));
            }
        }

        // The upsert is keyed by browser id, so a same-identity race
        // past the checks above still cannot create a second record.
        let stored = self
            .store
            .upsert_message(browser_id, name, message, submission_id)
            .await?;
        info!("Added new message from {} [Browser ID: {}]", name, browser_id);
        Ok(SubmitOutcome::Stored(stored))
    }

    /// Deletes the identity's own message.
    pub async fn retract(&self, browser_id: &str) -> Result<(), ServiceError> {
        Self::require_browser_id(browser_id)?;
        if !self.store.delete_message(browser_id).await? {
            return Err(ServiceError::NotFound(
                "No message found to delete".to_string(),
            ));
        }
        Ok(())
    }

    /// Privileged delete by record id, independent of ownership.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), ServiceError> {
        if !self.store.delete_message_by_id(id).await? {
            return Err(ServiceError::NotFound("Message not found".to_string()));
        }
        info!("Message {} deleted by admin", id);
        Ok(())
    }

    /// Privileged: deletes every message.
    pub async fn clear_all(&self) -> Result<(), ServiceError> {
        self.store.clear_messages().await?;
        info!("All messages cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStorage;

    async fn service(dir: &tempfile::TempDir) -> MessageService {
        MessageService::new(Arc::new(FileStorage::open(dir.path()).await.unwrap()))
    }

    fn submission(name: &str, message: &str, browser_id: &str) -> SubmitMessage {
        SubmitMessage {
            name: name.to_string(),
            message: message.to_string(),
            browser_id: browser_id.to_string(),
            submission_id: None,
        }
    }

    fn stored(outcome: SubmitOutcome) -> MessageRecord {
        match outcome {
            SubmitOutcome::Stored(record) => record,
            other => panic!("expected Stored, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submission_trims_name_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;
        let record = stored(messages.submit(submission("Ann ", " hi ", "b2")).await.unwrap());
        assert_eq!(record.name, "Ann");
        assert_eq!(record.message, "hi");
        assert_eq!(record.browser_id, "b2");
    }

    #[tokio::test]
    async fn test_resubmission_by_same_identity_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;

        let first = stored(messages.submit(submission("Ann", "hi", "b2")).await.unwrap());
        let second = stored(messages.submit(submission("Annie", "bye", "b2")).await.unwrap());

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Annie");
        assert_eq!(second.message, "bye");

        let listed = messages.list().await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_layer_wins_over_duplicate_window() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;

        messages.submit(submission("Ann", "hi", "b2")).await.unwrap();
        // Identical text, same identity, inside the window: still an
        // in-place update, not a duplicate rejection.
        let outcome = messages.submit(submission("Ann", "hi", "b2")).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Stored(_)));
    }

    #[tokio::test]
    async fn test_identical_text_from_other_identity_is_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;

        let first = stored(messages.submit(submission("Ann", "hi", "b1")).await.unwrap());
        let outcome = messages.submit(submission("Ann", "hi", "b2")).await.unwrap();
        match outcome {
            SubmitOutcome::Duplicate(earlier) => assert_eq!(earlier.id, first.id),
            other => panic!("expected Duplicate, got {:?}", other),
        }
        assert_eq!(messages.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submission_token_replay_returns_the_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;

        let mut first = submission("Ann", "hi", "b1");
        first.submission_id = Some("tok-1".to_string());
        let first = stored(messages.submit(first).await.unwrap());

        // Different identity and different text, same token.
        let mut replay = submission("Ann B", "hello there", "b2");
        replay.submission_id = Some("tok-1".to_string());
        match messages.submit(replay).await.unwrap() {
            SubmitOutcome::Replayed(record) => assert_eq!(record.id, first.id),
            other => panic!("expected Replayed, got {:?}", other),
        }
        assert_eq!(messages.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;
        assert!(matches!(
            messages.submit(submission("  ", "hi", "b1")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            messages.submit(submission("Ann", "   ", "b1")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            messages.submit(submission("Ann", "hi", "")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_browser_id_is_reported_before_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;
        // Both checks would fire; the identity check comes first.
        match messages.submit(submission("  ", "hi", "")).await {
            Err(ServiceError::InvalidInput(msg)) => assert_eq!(msg, "Browser ID is required"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retract_and_admin_delete() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;

        let record = stored(messages.submit(submission("Ann", "hi", "b1")).await.unwrap());
        assert!(matches!(
            messages.retract("b9").await,
            Err(ServiceError::NotFound(_))
        ));
        messages.retract("b1").await.unwrap();

        assert!(matches!(
            messages.delete_by_id(record.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_all_empties_the_book() {
        let dir = tempfile::tempdir().unwrap();
        let messages = service(&dir).await;
        messages.submit(submission("Ann", "hi", "b1")).await.unwrap();
        messages.submit(submission("Bo", "hey", "b2")).await.unwrap();
        messages.clear_all().await.unwrap();
        assert!(messages.list().await.unwrap().is_empty());
    }
}
