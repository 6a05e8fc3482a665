//! # Offline Storage
//!
//! The degraded "no database" mode: reads answer with empty results so
//! the site still renders, writes fail with [`StorageError::Unavailable`]
//! and surface as HTTP 503.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{MessageRecord, PublicVote, VoteCounts, VoteRecord, VoteType};
use crate::storage::{Storage, VoteInsert};

pub struct OfflineStorage;

#[async_trait]
impl Storage for OfflineStorage {
    async fn vote_counts(&self) -> Result<VoteCounts, StorageError> {
        Ok(VoteCounts::default())
    }

    async fn list_votes(&self) -> Result<Vec<PublicVote>, StorageError> {
        Ok(Vec::new())
    }

    async fn find_vote(&self, _browser_id: &str) -> Result<Option<VoteRecord>, StorageError> {
        Ok(None)
    }

    async fn insert_vote(
        &self,
        _browser_id: &str,
        _vote_type: VoteType,
        _ip: Option<&str>,
    ) -> Result<VoteInsert, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn delete_vote(&self, _browser_id: &str) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn clear_votes(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn list_messages(&self) -> Result<Vec<MessageRecord>, StorageError> {
        Ok(Vec::new())
    }

    async fn find_message(&self, _browser_id: &str) -> Result<Option<MessageRecord>, StorageError> {
        Ok(None)
    }

    async fn find_message_by_submission(
        &self,
        _submission_id: &str,
    ) -> Result<Option<MessageRecord>, StorageError> {
        Ok(None)
    }

    async fn find_recent_duplicate(
        &self,
        _name: &str,
        _message: &str,
        _window: chrono::Duration,
    ) -> Result<Option<MessageRecord>, StorageError> {
        Ok(None)
    }

    async fn upsert_message(
        &self,
        _browser_id: &str,
        _name: &str,
        _message: &str,
        _submission_id: Option<&str>,
    ) -> Result<MessageRecord, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn delete_message(&self, _browser_id: &str) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn delete_message_by_id(&self, _id: i64) -> Result<bool, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn clear_messages(&self) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}
