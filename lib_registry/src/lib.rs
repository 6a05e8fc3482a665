//! # lib_registry
//!
//! Core library for the baby registry backend: the gender-prediction
//! vote service and the guestbook message service, the storage
//! backends they run on (PostgreSQL, flat JSON files, or a degraded
//! offline mode), the pseudonymous identity helpers, and the admin
//! gate wrapping privileged operations.
//!
//! The HTTP surface lives in the `servers` crate; everything here is
//! transport-agnostic and exercised directly by the unit tests.

// Declare the modules to re-export
pub mod admin;
pub mod config_sys;
pub mod error;
pub mod identity;
pub mod records;
pub mod services;
pub mod storage;

// Re-export the request-facing surface
pub use admin::AdminGate;
pub use config_sys::{AdminAccount, AdminConfig, RuntimeConfig};
pub use error::{ServiceError, StorageError};
pub use records::{MessageRecord, PublicVote, VoteCounts, VoteRecord, VoteType};
pub use services::{
    MessageService, MessageStatus, SubmitMessage, SubmitOutcome, VoteOutcome, VoteService,
    VoteStatus,
};
pub use storage::{open_storage, FileStorage, OfflineStorage, PgStorage, Storage};
