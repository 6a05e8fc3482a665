//! # Storage Backends
//!
//! One `Storage` contract, three implementations picked once at startup
//! by configuration presence, never by runtime branching in handlers:
//!
//! - [`postgres::PgStorage`] when a database URL is configured,
//! - [`file::FileStorage`] when a data directory is configured,
//! - [`offline::OfflineStorage`] when neither is, or when relational
//!   initialization fails within its timeout.
//!
//! The one-record-per-identity invariants live here, not in service
//! code: vote insertion is insert-unless-exists and message storage is
//! an atomic upsert keyed by browser id, so two near-simultaneous
//! requests from one identity cannot produce two records.
//!
//! Services never cache records. Every operation re-reads current
//! state, and a write is not acknowledged until durably applied (the
//! file backend re-reads its document to verify).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config_sys::RuntimeConfig;
use crate::error::StorageError;
use crate::records::{MessageRecord, PublicVote, VoteCounts, VoteRecord, VoteType};

pub mod file;
pub mod offline;
pub mod postgres;

pub use file::FileStorage;
pub use offline::OfflineStorage;
pub use postgres::PgStorage;

/// Bound on relational pool creation plus schema bootstrap. On expiry
/// the server degrades to the offline backend instead of hanging.
pub const PG_INIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a conditional vote insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteInsert {
    /// A new record was created.
    Inserted,
    /// The identity already holds a vote; nothing was written. Carries
    /// the stored choice so the caller can report it without a re-read.
    AlreadyVoted(VoteType),
}

/// Durable record store for votes and messages.
#[async_trait]
pub trait Storage: Send + Sync {
    // --- votes -------------------------------------------------------

    async fn vote_counts(&self) -> Result<VoteCounts, StorageError>;

    /// All votes, anonymized, newest first.
    async fn list_votes(&self) -> Result<Vec<PublicVote>, StorageError>;

    async fn find_vote(&self, browser_id: &str) -> Result<Option<VoteRecord>, StorageError>;

    /// Inserts unless the identity already holds a vote. Never updates
    /// the stored choice.
    async fn insert_vote(
        &self,
        browser_id: &str,
        vote_type: VoteType,
        ip: Option<&str>,
    ) -> Result<VoteInsert, StorageError>;

    /// Deletes the identity's vote. Returns whether one existed.
    async fn delete_vote(&self, browser_id: &str) -> Result<bool, StorageError>;

    async fn clear_votes(&self) -> Result<(), StorageError>;

    // --- messages ----------------------------------------------------

    /// All messages, newest first.
    async fn list_messages(&self) -> Result<Vec<MessageRecord>, StorageError>;

    async fn find_message(&self, browser_id: &str) -> Result<Option<MessageRecord>, StorageError>;

    /// Lookup by submission token, for network-retry idempotence.
    async fn find_message_by_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<MessageRecord>, StorageError>;

    /// A message with identical (name, message) created within `window`
    /// of now, if any.
    async fn find_recent_duplicate(
        &self,
        name: &str,
        message: &str,
        window: chrono::Duration,
    ) -> Result<Option<MessageRecord>, StorageError>;

    /// Insert-or-update keyed by browser id. An existing record keeps
    /// its id; name, message and timestamp are replaced, and the
    /// submission token is replaced only when a new one is supplied.
    async fn upsert_message(
        &self,
        browser_id: &str,
        name: &str,
        message: &str,
        submission_id: Option<&str>,
    ) -> Result<MessageRecord, StorageError>;

    /// Deletes the identity's message. Returns whether one existed.
    async fn delete_message(&self, browser_id: &str) -> Result<bool, StorageError>;

    /// Privileged delete by record id. Returns whether one existed.
    async fn delete_message_by_id(&self, id: i64) -> Result<bool, StorageError>;

    async fn clear_messages(&self) -> Result<(), StorageError>;
}

/// Opens the backend selected by configuration.
///
/// Relational initialization failures degrade to [`OfflineStorage`]
/// with a warning (the original behavior when the database is
/// unreachable); a file backend that cannot be opened is a hard error,
/// since the operator asked for it explicitly.
pub async fn open_storage(config: &RuntimeConfig) -> Result<Arc<dyn Storage>, StorageError> {
    if let Some(database_url) = &config.database_url {
        match PgStorage::connect(database_url, PG_INIT_TIMEOUT).await {
            Ok(storage) => {
                info!("Storage backend: postgres");
                return Ok(Arc::new(storage));
            }
            Err(e) => {
                warn!("Database initialization failed, degrading to offline mode: {}", e);
                return Ok(Arc::new(OfflineStorage));
            }
        }
    }

    if let Some(data_dir) = &config.data_dir {
        let storage = FileStorage::open(data_dir).await?;
        info!("Storage backend: file ({})", data_dir.display());
        return Ok(Arc::new(storage));
    }

    warn!("No DATABASE_URL or DATA_DIR configured; reads are empty, writes answer 503");
    Ok(Arc::new(OfflineStorage))
}
