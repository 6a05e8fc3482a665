//! # Services
//!
//! The request-facing logic over the storage contract: one vote per
//! identity, one message per identity, duplicate suppression and the
//! privileged destructive paths. Services hold no state of their own —
//! every operation re-reads through the `Storage` trait.

pub mod messages;
pub mod votes;

pub use messages::{MessageService, MessageStatus, SubmitMessage, SubmitOutcome};
pub use votes::{VoteOutcome, VoteService, VoteStatus};
