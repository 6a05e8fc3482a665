//! # Identity Provider
//!
//! Pseudonymous client identifiers ("browser ids") and per-attempt
//! submission tokens. The id format is a timestamp plus a random base36
//! suffix, the same shape the browser client persists in localStorage,
//! so server-side tooling and tests can forge compatible identities.
//!
//! [`IdentityFile`] is the native analog of that localStorage slot:
//! generate once, persist, return the persisted value forever after.
//! Storage failures are not errors; they degrade to a fresh token per
//! call, which at worst makes the caller look like a never-voted
//! identity.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use tracing::warn;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Generates a fresh browser id: `browser_{unix-millis}_{13 base36 chars}`.
pub fn generate_browser_id() -> String {
    format!(
        "browser_{}_{}",
        Utc::now().timestamp_millis(),
        random_base36(13)
    )
}

/// Generates a fresh submission token: `{unix-millis}_{7 base36 chars}`.
/// One token marks one logical submission across network retries.
pub fn generate_submission_id() -> String {
    format!("{}_{}", Utc::now().timestamp_millis(), random_base36(7))
}

/// File-persisted identity token.
#[derive(Debug, Clone)]
pub struct IdentityFile {
    path: PathBuf,
}

impl IdentityFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the persisted token, creating and persisting a fresh one
    /// on first call. Never fails: an unusable backing file simply means
    /// a fresh token every call.
    pub fn get(&self) -> String {
        if let Ok(existing) = fs::read_to_string(&self.path) {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }

        let token = generate_browser_id();
        if let Err(e) = fs::write(&self.path, &token) {
            warn!(
                "Could not persist identity token to {}: {}",
                self.path.display(),
                e
            );
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_ids_have_expected_shape_and_differ() {
        let a = generate_browser_id();
        let b = generate_browser_id();
        assert!(a.starts_with("browser_"));
        assert_eq!(a.split('_').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn test_submission_tokens_have_expected_shape() {
        let token = generate_submission_id();
        let mut parts = token.split('_');
        let millis = parts.next().unwrap();
        let suffix = parts.next().unwrap();
        assert!(parts.next().is_none());
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 7);
    }

    #[test]
    fn test_identity_file_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityFile::new(dir.path().join("browser_id"));
        let first = identity.get();
        let second = identity.get();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unwritable_identity_file_degrades_to_fresh_tokens() {
        let identity = IdentityFile::new("/nonexistent-dir/browser_id");
        let first = identity.get();
        let second = identity.get();
        assert!(first.starts_with("browser_"));
        // No persistence available, so every call is a new identity.
        assert_ne!(first, second);
    }
}
