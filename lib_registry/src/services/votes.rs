//! # Vote Service
//!
//! One vote per identity, write-once until retracted. A repeated
//! submit is observably safe: it never creates a second record, never
//! flips the stored choice, and reports the current truth (existing
//! choice plus live counts) back to the caller.

use std::sync::Arc;

use tracing::info;

use crate::error::ServiceError;
use crate::records::{PublicVote, VoteCounts, VoteType};
use crate::storage::{Storage, VoteInsert};

/// Result of a has-voted lookup.
#[derive(Debug, Clone, Copy)]
pub struct VoteStatus {
    pub has_voted: bool,
    pub vote_type: Option<VoteType>,
}

/// Result of a vote submission.
#[derive(Debug, Clone, Copy)]
pub enum VoteOutcome {
    /// A new vote was recorded; carries the refreshed counts.
    Accepted(VoteCounts),
    /// The identity had already voted. Nothing changed; the existing
    /// choice and current counts let the caller resync without a
    /// follow-up read.
    AlreadyVoted {
        counts: VoteCounts,
        existing: VoteType,
    },
}

#[derive(Clone)]
pub struct VoteService {
    store: Arc<dyn Storage>,
}

impl VoteService {
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

    /// Aggregated counts; an empty store yields zeros.
    pub async fn counts(&self) -> Result<VoteCounts, ServiceError> {
        Ok(self.store.vote_counts().await?)
    }

    /// All votes, anonymized, newest first.
    pub async fn list_all(&self) -> Result<Vec<PublicVote>, ServiceError> {
        Ok(self.store.list_votes().await?)
    }

    /// Pure lookup, no side effects.
    pub async fn check(&self, browser_id: &str) -> Result<VoteStatus, ServiceError> {
        Self::require_browser_id(browser_id)?;
        let existing = self.store.find_vote(browser_id).await?;
        Ok(VoteStatus {
            has_voted: existing.is_some(),
            vote_type: existing.map(|v| v.vote_type),
        })
    }

    /// Casts a vote, unless the identity already holds one.
    pub async fn submit(
        &self,
        vote_type: &str,
        browser_id: &str,
        ip: Option<&str>,
    ) -> Result<VoteOutcome, ServiceError> {
        let vote_type: VoteType = vote_type
            .parse()
            .map_err(|_| ServiceError::InvalidInput("Invalid vote type".to_string()))?;
        Self::require_browser_id(browser_id)?;

        info!("Received vote: {} from browserId: {}", vote_type, browser_id);
        match self.store.insert_vote(browser_id, vote_type, ip).await? {
            VoteInsert::Inserted => {
                info!("Added new vote");
                Ok(VoteOutcome::Accepted(self.store.vote_counts().await?))
            }
            VoteInsert::AlreadyVoted(existing) => {
                info!("Browser {} already voted: {}", browser_id, existing);
                Ok(VoteOutcome::AlreadyVoted {
                    counts: self.store.vote_counts().await?,
                    existing,
                })
            }
        }
    }

    /// Retracts the identity's own vote and returns refreshed counts.
    pub async fn retract(&self, browser_id: &str) -> Result<VoteCounts, ServiceError> {
        Self::require_browser_id(browser_id)?;
        if !self.store.delete_vote(browser_id).await? {
            return Err(ServiceError::NotFound(
                "No vote found to delete".to_string(),
            ));
        }
        Ok(self.store.vote_counts().await?)
    }

    /// Privileged: deletes every vote.
    pub async fn clear_all(&self) -> Result<VoteCounts, ServiceError> {
        self.store.clear_votes().await?;
        info!("All votes cleared");
        Ok(VoteCounts::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileStorage;

    async fn service(dir: &tempfile::TempDir) -> VoteService {
        VoteService::new(Arc::new(FileStorage::open(dir.path()).await.unwrap()))
    }

    #[tokio::test]
    async fn test_submit_then_check_reflects_the_choice() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;

        match votes.submit("boy", "b1", None).await.unwrap() {
            VoteOutcome::Accepted(counts) => {
                assert_eq!(counts, VoteCounts { boy: 1, girl: 0, total: 1 });
            }
            other => panic!("expected acceptance, got {:?}", other),
        }

        let status = votes.check("b1").await.unwrap();
        assert!(status.has_voted);
        assert_eq!(status.vote_type, Some(VoteType::Boy));
    }

    #[tokio::test]
    async fn test_repeat_submit_is_a_reported_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;
        votes.submit("boy", "b1", None).await.unwrap();

        // Even with a different choice: no new record, no flip.
        match votes.submit("girl", "b1", None).await.unwrap() {
            VoteOutcome::AlreadyVoted { counts, existing } => {
                assert_eq!(counts.total, 1);
                assert_eq!(existing, VoteType::Boy);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(votes.check("b1").await.unwrap().vote_type, Some(VoteType::Boy));
    }

    #[tokio::test]
    async fn test_total_always_equals_boy_plus_girl() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;
        for (id, choice) in [("b1", "boy"), ("b2", "girl"), ("b3", "girl"), ("b1", "girl")] {
            votes.submit(choice, id, None).await.unwrap();
        }
        let counts = votes.counts().await.unwrap();
        assert_eq!(counts.total, counts.boy + counts.girl);
        assert_eq!(counts, VoteCounts { boy: 1, girl: 2, total: 3 });
    }

    #[tokio::test]
    async fn test_retract_decrements_and_clears_status() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;
        votes.submit("girl", "b1", None).await.unwrap();
        votes.submit("boy", "b2", None).await.unwrap();

        let counts = votes.retract("b1").await.unwrap();
        assert_eq!(counts.total, 1);
        assert!(!votes.check("b1").await.unwrap().has_voted);

        // Retracting again is NotFound.
        assert!(matches!(
            votes.retract("b1").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;
        assert!(matches!(
            votes.submit("maybe", "b1", None).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            votes.submit("boy", "  ", None).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_all_resets_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let votes = service(&dir).await;
        votes.submit("boy", "b1", None).await.unwrap();
        assert_eq!(votes.clear_all().await.unwrap(), VoteCounts::default());
        assert_eq!(votes.counts().await.unwrap().total, 0);
    }
}
