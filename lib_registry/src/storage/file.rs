//! # File Storage
//!
//! Flat-document backend: two independent JSON files, `votes.json` and
//! `messages.json`, each holding an array of records and rewritten
//! wholesale on every mutation. An async mutex serializes every
//! read-modify-write, which is what makes insert-unless-exists and the
//! identity upsert atomic within the process.
//!
//! A write is not acknowledged until the document has been replaced via
//! temp-file-plus-rename and read back to verify what landed on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageError;
use crate::records::{MessageRecord, PublicVote, VoteCounts, VoteRecord, VoteType};
use crate::storage::{Storage, VoteInsert};

const VOTES_DOC: &str = "votes.json";
const MESSAGES_DOC: &str = "messages.json";

pub struct FileStorage {
    votes_path: PathBuf,
    messages_path: PathBuf,
    /// Serializes read-modify-write cycles across both documents.
    lock: Mutex<()>,
    /// High-water marks for id allocation, one per document.
    next_vote_id: AtomicI64,
    next_message_id: AtomicI64,
}

impl FileStorage {
    /// Opens (and creates, if needed) the backing directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await.map_err(|e| StorageError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            votes_path: dir.join(VOTES_DOC),
            messages_path: dir.join(MESSAGES_DOC),
            lock: Mutex::new(()),
            next_vote_id: AtomicI64::new(0),
            next_message_id: AtomicI64::new(0),
        })
    }

    /// Loads a document; a missing file is an empty collection.
    async fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Rewrites a document wholesale: serialize, write a sibling temp
    /// file, rename into place, then read back and compare.
    async fn persist<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StorageError> {
        let io_err = |e: std::io::Error| StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let bytes = serde_json::to_vec_pretty(records).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await.map_err(io_err)?;
        fs::rename(&tmp, path).await.map_err(io_err)?;

        let reread = fs::read(path).await.map_err(io_err)?;
        if reread != bytes {
            return Err(StorageError::Verification {
                path: path.to_path_buf(),
            });
        }
        debug!("Persisted {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// Allocates the next record id: one past the highest id in the
    /// document or past any id handed out this process, whichever is
    /// larger. Deleting the newest record never frees its id for
    /// reuse, matching BIGSERIAL in the relational backend. Callers
    /// hold the write lock.
    fn next_id<I: Iterator<Item = i64>>(counter: &AtomicI64, ids: I) -> i64 {
        let floor = ids.max().unwrap_or(0) + 1;
        let id = counter.load(Ordering::Relaxed).max(floor);
        counter.store(id + 1, Ordering::Relaxed);
        id
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn vote_counts(&self) -> Result<VoteCounts, StorageError> {
        let _guard = self.lock.lock().await;
        let votes: Vec<VoteRecord> = Self::load(&self.votes_path).await?;
        let boy = votes.iter().filter(|v| v.vote_type == VoteType::Boy).count() as i64;
        let girl = votes.len() as i64 - boy;
        Ok(VoteCounts {
            boy,
            girl,
            total: votes.len() as i64,
        })
    }

    async fn list_votes(&self) -> Result<Vec<PublicVote>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut votes: Vec<VoteRecord> = Self::load(&self.votes_path).await?;
        votes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(votes.iter().map(PublicVote::from).collect())
    }

    async fn find_vote(&self, browser_id: &str) -> Result<Option<VoteRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let votes: Vec<VoteRecord> = Self::load(&self.votes_path).await?;
        Ok(votes.into_iter().find(|v| v.browser_id == browser_id))
    }

    async fn insert_vote(
        &self,
        browser_id: &str,
        vote_type: VoteType,
        ip: Option<&str>,
    ) -> Result<VoteInsert, StorageError> {
        let _guard = self.lock.lock().await;
        let mut votes: Vec<VoteRecord> = Self::load(&self.votes_path).await?;

        if let Some(existing) = votes.iter().find(|v| v.browser_id == browser_id) {
            return Ok(VoteInsert::AlreadyVoted(existing.vote_type));
        }

        votes.push(VoteRecord {
            id: Self::next_id(&self.next_vote_id, votes.iter().map(|v| v.id)),
            browser_id: browser_id.to_string(),
            vote_type,
            ip: ip.map(str::to_string),
            created_at: Utc::now(),
        });
        Self::persist(&self.votes_path, &votes).await?;
        Ok(VoteInsert::Inserted)
    }

    async fn delete_vote(&self, browser_id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut votes: Vec<VoteRecord> = Self::load(&self.votes_path).await?;
        let before = votes.len();
        votes.retain(|v| v.browser_id != browser_id);
        if votes.len() == before {
            return Ok(false);
        }
        Self::persist(&self.votes_path, &votes).await?;
        Ok(true)
    }

    async fn clear_votes(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        Self::persist::<VoteRecord>(&self.votes_path, &[]).await
    }

    async fn list_messages(&self) -> Result<Vec<MessageRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(messages)
    }

    async fn find_message(&self, browser_id: &str) -> Result<Option<MessageRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        Ok(messages.into_iter().find(|m| m.browser_id == browser_id))
    }

    async fn find_message_by_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<MessageRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        Ok(messages
            .into_iter()
            .find(|m| m.submission_id.as_deref() == Some(submission_id)))
    }

    async fn find_recent_duplicate(
        &self,
        name: &str,
        message: &str,
        window: chrono::Duration,
    ) -> Result<Option<MessageRecord>, StorageError> {
        let _guard = self.lock.lock().await;
        let messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        let cutoff = Utc::now() - window;
        Ok(messages
            .into_iter()
            .find(|m| m.name == name && m.message == message && m.created_at > cutoff))
    }

    async fn upsert_message(
        &self,
        browser_id: &str,
        name: &str,
        message: &str,
        submission_id: Option<&str>,
    ) -> Result<MessageRecord, StorageError> {
        let _guard = self.lock.lock().await;
        let mut messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;

        let record = match messages.iter_mut().find(|m| m.browser_id == browser_id) {
            Some(existing) => {
                // Same identity resubmitting: replace content in place,
                // keep the id, only overwrite the token if a new one came.
                existing.name = name.to_string();
                existing.message = message.to_string();
                if let Some(submission_id) = submission_id {
                    existing.submission_id = Some(submission_id.to_string());
                }
                existing.created_at = Utc::now();
                existing.clone()
            }
            None => {
                let record = MessageRecord {
                    id: Self::next_id(&self.next_message_id, messages.iter().map(|m| m.id)),
                    browser_id: browser_id.to_string(),
                    name: name.to_string(),
                    message: message.to_string(),
                    submission_id: submission_id.map(str::to_string),
                    created_at: Utc::now(),
                };
                messages.push(record.clone());
                record
            }
        };

        Self::persist(&self.messages_path, &messages).await?;
        Ok(record)
    }

    async fn delete_message(&self, browser_id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        let before = messages.len();
        messages.retain(|m| m.browser_id != browser_id);
        if messages.len() == before {
            return Ok(false);
        }
        Self::persist(&self.messages_path, &messages).await?;
        Ok(true)
    }

    async fn delete_message_by_id(&self, id: i64) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut messages: Vec<MessageRecord> = Self::load(&self.messages_path).await?;
        let before = messages.len();
        messages.retain(|m| m.id != id);
        if messages.len() == before {
            return Ok(false);
        }
        Self::persist(&self.messages_path, &messages).await?;
        Ok(true)
    }

    async fn clear_messages(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        Self::persist::<MessageRecord>(&self.messages_path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn storage(dir: &tempfile::TempDir) -> FileStorage {
        FileStorage::open(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_votes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = storage(&dir).await;
            store.insert_vote("b1", VoteType::Boy, None).await.unwrap();
            store.insert_vote("b2", VoteType::Girl, Some("10.0.0.1")).await.unwrap();
        }
        let store = storage(&dir).await;
        let counts = store.vote_counts().await.unwrap();
        assert_eq!(counts, VoteCounts { boy: 1, girl: 1, total: 2 });
    }

    #[tokio::test]
    async fn test_insert_vote_is_write_once_per_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;

        assert_eq!(
            store.insert_vote("b1", VoteType::Boy, None).await.unwrap(),
            VoteInsert::Inserted
        );
        // Second attempt reports the stored choice and writes nothing.
        assert_eq!(
            store.insert_vote("b1", VoteType::Girl, None).await.unwrap(),
            VoteInsert::AlreadyVoted(VoteType::Boy)
        );

        let counts = store.vote_counts().await.unwrap();
        assert_eq!(counts.total, 1);
        assert_eq!(store.find_vote("b1").await.unwrap().unwrap().vote_type, VoteType::Boy);
    }

    #[tokio::test]
    async fn test_listing_votes_is_anonymized() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        store.insert_vote("b1", VoteType::Girl, Some("10.0.0.9")).await.unwrap();

        let listed = store.list_votes().await.unwrap();
        assert_eq!(listed.len(), 1);
        let value = serde_json::to_value(&listed[0]).unwrap();
        assert!(value.get("browserId").is_none());
        assert!(value.get("ip").is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_id_and_merges_submission_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;

        let first = store.upsert_message("b1", "Ann", "hi", Some("tok-1")).await.unwrap();
        let second = store.upsert_message("b1", "Ann", "bye", None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.message, "bye");
        // No new token supplied, the old one sticks.
        assert_eq!(second.submission_id.as_deref(), Some("tok-1"));
        assert_eq!(store.list_messages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_duplicate_respects_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;

        store.upsert_message("b1", "Ann", "hi", None).await.unwrap();
        let hit = store
            .find_recent_duplicate("Ann", "hi", Duration::seconds(10))
            .await
            .unwrap();
        assert!(hit.is_some());

        // Age the stored record past the window by rewriting the doc.
        let mut messages: Vec<MessageRecord> =
            FileStorage::load(&store.messages_path).await.unwrap();
        messages[0].created_at = Utc::now() - Duration::seconds(60);
        FileStorage::persist(&store.messages_path, &messages).await.unwrap();

        let miss = store
            .find_recent_duplicate("Ann", "hi", Duration::seconds(10))
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_delete_paths_report_presence() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;

        let record = store.upsert_message("b1", "Ann", "hi", None).await.unwrap();
        assert!(!store.delete_message("someone-else").await.unwrap());
        assert!(store.delete_message_by_id(record.id).await.unwrap());
        assert!(!store.delete_message_by_id(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_deleting_the_newest_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;

        store.upsert_message("b1", "Ann", "one", None).await.unwrap();
        let newest = store.upsert_message("b2", "Bo", "two", None).await.unwrap();
        assert!(store.delete_message_by_id(newest.id).await.unwrap());

        // A client still holding the deleted id must not be able to
        // address the replacement record with it.
        let next = store.upsert_message("b3", "Cy", "three", None).await.unwrap();
        assert!(next.id > newest.id);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage(&dir).await;
        tokio::fs::write(dir.path().join("votes.json"), b"not json")
            .await
            .unwrap();
        assert!(matches!(
            store.vote_counts().await,
            Err(StorageError::Corrupt { .. })
        ));
    }
}
