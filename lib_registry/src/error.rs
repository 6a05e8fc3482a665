//! # Error Taxonomy
//!
//! Two layers of errors, both `thiserror` enums:
//! - [`StorageError`] is everything a backend can fail with. The server
//!   maps `Unavailable` to HTTP 503 and everything else to 500.
//! - [`ServiceError`] is what the vote/message services return to the
//!   HTTP layer: invalid input (400), not found (404) or a storage
//!   failure passed through unchanged.
//!
//! Conflict outcomes ("already voted", "duplicate message") are not
//! errors here. They carry current state back to the caller, so the
//! services model them as outcome enum variants instead.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No backend is configured, or relational initialization failed.
    /// Reads degrade to empty results before ever producing this; only
    /// writes surface it.
    #[error("Database not available")]
    Unavailable,

    /// Could not obtain a connection from the deadpool pool.
    #[error("Failed to get connection from pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// Query execution failed.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// Filesystem failure in the file-backed backend.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted document no longer parses as JSON.
    #[error("Stored document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The read-back after a wholesale rewrite did not match what was
    /// written.
    #[error("Document {path} failed read-back verification after write")]
    Verification { path: PathBuf },

    /// A stored column value no longer matches the domain model.
    #[error("Unexpected value in column {column}: {value}")]
    Decode {
        column: &'static str,
        value: String,
    },

    /// Backend construction failed (bad URL, schema bootstrap, timeout).
    #[error("Storage initialization failed: {0}")]
    Init(String),
}

/// Failures returned by the vote and message services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required field is missing, blank after trimming, or an enum
    /// value is outside its allowed set. The message is user-facing.
    #[error("{0}")]
    InvalidInput(String),

    /// Retracting or deleting something that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Propagated storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
