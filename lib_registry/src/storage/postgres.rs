//! # PostgreSQL Storage
//!
//! Relational backend over a `deadpool_postgres` pool. The schema is
//! bootstrapped on connect (`CREATE TABLE IF NOT EXISTS`) and carries a
//! UNIQUE constraint on `browser_id` in both tables, so the
//! one-record-per-identity invariants are enforced by the database:
//! vote insertion goes through `ON CONFLICT DO NOTHING` and message
//! storage through `ON CONFLICT DO UPDATE`, never through a bare
//! check-then-insert.
//!
//! Connect-plus-bootstrap is bounded by a timeout; the caller degrades
//! to the offline backend when it expires instead of hanging.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config as DeadpoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};
use tracing::info;

use crate::error::StorageError;
use crate::records::{MessageRecord, PublicVote, VoteCounts, VoteRecord, VoteType};
use crate::storage::{Storage, VoteInsert};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS votes (
    id BIGSERIAL PRIMARY KEY,
    browser_id VARCHAR(255) UNIQUE NOT NULL,
    vote_type VARCHAR(10) NOT NULL CHECK (vote_type IN ('boy', 'girl')),
    ip VARCHAR(64),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS messages (
    id BIGSERIAL PRIMARY KEY,
    browser_id VARCHAR(255) UNIQUE NOT NULL,
    name VARCHAR(255) NOT NULL,
    message TEXT NOT NULL,
    submission_id VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_votes_browser_id ON votes (browser_id);
CREATE INDEX IF NOT EXISTS idx_messages_browser_id ON messages (browser_id);
";

const MESSAGE_COLUMNS: &str = "id, browser_id, name, message, submission_id, created_at";

pub struct PgStorage {
    pool: Pool,
}

impl PgStorage {
    /// Creates the pool and bootstraps the schema, bounded by
    /// `init_timeout`.
    pub async fn connect(database_url: &str, init_timeout: Duration) -> Result<Self, StorageError> {
        let mut pg_pool_config = DeadpoolConfig::new();
        pg_pool_config.url = Some(database_url.to_string());
        pg_pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = pg_pool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StorageError::Init(format!("Failed to create database pool: {}", e)))?;

        let storage = Self { pool };
        tokio::time::timeout(init_timeout, storage.init_schema())
            .await
            .map_err(|_| StorageError::Init("Database initialization timed out".to_string()))??;
        info!("Database tables initialized successfully");
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    fn vote_type_from(row: &Row) -> Result<VoteType, StorageError> {
        let raw: String = row.get("vote_type");
        raw.parse().map_err(|_| StorageError::Decode {
            column: "vote_type",
            value: raw,
        })
    }

    fn vote_from(row: &Row) -> Result<VoteRecord, StorageError> {
        Ok(VoteRecord {
            id: row.get("id"),
            browser_id: row.get("browser_id"),
            vote_type: Self::vote_type_from(row)?,
            ip: row.get("ip"),
            created_at: row.get("created_at"),
        })
    }

    fn message_from(row: &Row) -> MessageRecord {
        MessageRecord {
            id: row.get("id"),
            browser_id: row.get("browser_id"),
            name: row.get("name"),
            message: row.get("message"),
            submission_id: row.get("submission_id"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn vote_counts(&self) -> Result<VoteCounts, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT
                    COUNT(*) FILTER (WHERE vote_type = 'boy') AS boy,
                    COUNT(*) FILTER (WHERE vote_type = 'girl') AS girl,
                    COUNT(*) AS total
                 FROM votes",
                &[],
            )
            .await?;
        Ok(VoteCounts {
            boy: row.get("boy"),
            girl: row.get("girl"),
            total: row.get("total"),
        })
    }

    async fn list_votes(&self) -> Result<Vec<PublicVote>, StorageError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT vote_type, created_at FROM votes ORDER BY created_at DESC, id DESC",
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(PublicVote {
                    vote_type: Self::vote_type_from(row)?,
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    async fn find_vote(&self, browser_id: &str) -> Result<Option<VoteRecord>, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, browser_id, vote_type, ip, created_at FROM votes WHERE browser_id = $1",
                &[&browser_id],
            )
            .await?;
        row.as_ref().map(Self::vote_from).transpose()
    }

    async fn insert_vote(
        &self,
        browser_id: &str,
        vote_type: VoteType,
        ip: Option<&str>,
    ) -> Result<VoteInsert, StorageError> {
        let client = self.pool.get().await?;
        let inserted = client
            .execute(
                "INSERT INTO votes (browser_id, vote_type, ip) VALUES ($1, $2, $3)
                 ON CONFLICT (browser_id) DO NOTHING",
                &[&browser_id, &vote_type.as_str(), &ip],
            )
            .await?;
        if inserted == 1 {
            return Ok(VoteInsert::Inserted);
        }

        // The uniqueness constraint absorbed the insert: report the
        // stored choice without touching it.
        let row = client
            .query_one(
                "SELECT vote_type FROM votes WHERE browser_id = $1",
                &[&browser_id],
            )
            .await?;
        Ok(VoteInsert::AlreadyVoted(Self::vote_type_from(&row)?))
    }

    async fn delete_vote(&self, browser_id: &str) -> Result<bool, StorageError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM votes WHERE browser_id = $1", &[&browser_id])
            .await?;
        Ok(deleted > 0)
    }

    async fn clear_votes(&self) -> Result<(), StorageError> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM votes", &[]).await?;
        Ok(())
    }

    async fn list_messages(&self) -> Result<Vec<MessageRecord>, StorageError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY created_at DESC, id DESC"
                ),
                &[],
            )
            .await?;
        Ok(rows.iter().map(Self::message_from).collect())
    }

    async fn find_message(&self, browser_id: &str) -> Result<Option<MessageRecord>, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE browser_id = $1"),
                &[&browser_id],
            )
            .await?;
        Ok(row.as_ref().map(Self::message_from))
    }

    async fn find_message_by_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<MessageRecord>, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE submission_id = $1 LIMIT 1"
                ),
                &[&submission_id],
            )
            .await?;
        Ok(row.as_ref().map(Self::message_from))
    }

    async fn find_recent_duplicate(
        &self,
        name: &str,
        message: &str,
        window: chrono::Duration,
    ) -> Result<Option<MessageRecord>, StorageError> {
        let client = self.pool.get().await?;
        let cutoff: DateTime<Utc> = Utc::now() - window;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE name = $1 AND message = $2 AND created_at > $3
                     LIMIT 1"
                ),
                &[&name, &message, &cutoff],
            )
            .await?;
        Ok(row.as_ref().map(Self::message_from))
    }

    async fn upsert_message(
        &self,
        browser_id: &str,
        name: &str,
        message: &str,
        submission_id: Option<&str>,
    ) -> Result<MessageRecord, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO messages (browser_id, name, message, submission_id)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (browser_id) DO UPDATE SET
                        name = EXCLUDED.name,
                        message = EXCLUDED.message,
                        submission_id = COALESCE(EXCLUDED.submission_id, messages.submission_id),
                        created_at = NOW()
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                &[&browser_id, &name, &message, &submission_id],
            )
            .await?;
        Ok(Self::message_from(&row))
    }

    async fn delete_message(&self, browser_id: &str) -> Result<bool, StorageError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM messages WHERE browser_id = $1", &[&browser_id])
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_message_by_id(&self, id: i64) -> Result<bool, StorageError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM messages WHERE id = $1", &[&id])
            .await?;
        Ok(deleted > 0)
    }

    async fn clear_messages(&self) -> Result<(), StorageError> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM messages", &[]).await?;
        Ok(())
    }
}
