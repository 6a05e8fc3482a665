//! # Admin Gate
//!
//! Shared-secret gate in front of the privileged (destructive)
//! operations: bulk clears and delete-by-id. Stateless by design — the
//! admin key is a long-lived shared secret, not a session credential.
//!
//! Secrets are never compared byte-by-byte with `==` on the raw
//! strings; both sides are hashed first so the comparison works on
//! fixed-length digests and leaks neither length nor matching prefix.

use sha2::{Digest, Sha256};

use crate::config_sys::{AdminAccount, AdminConfig};

/// Compares two secrets through their SHA-256 digests.
fn digest_eq(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// The gate wrapping privileged mutation endpoints.
#[derive(Debug, Clone)]
pub struct AdminGate {
    key: String,
    accounts: Vec<AdminAccount>,
}

impl AdminGate {
    pub fn new(config: AdminConfig) -> Self {
        Self {
            key: config.key,
            accounts: config.accounts,
        }
    }

    /// Checks a provided admin key against the configured shared secret.
    pub fn authorize(&self, provided: &str) -> bool {
        digest_eq(provided, &self.key)
    }

    /// Checks credentials against the allow-list and hands back the
    /// shared admin key on success. The client attaches that key to
    /// subsequent privileged calls.
    pub fn login(&self, email: &str, password: &str) -> Option<&str> {
        let valid = self
            .accounts
            .iter()
            .any(|account| digest_eq(email, &account.email) && digest_eq(password, &account.password));
        valid.then(|| self.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AdminGate {
        AdminGate::new(AdminConfig {
            key: "test-admin-key".to_string(),
            accounts: vec![
                AdminAccount {
                    email: "admin@example.com".to_string(),
                    password: "registry-dev".to_string(),
                },
                AdminAccount {
                    email: "family".to_string(),
                    password: "registry-2026".to_string(),
                },
            ],
        })
    }

    #[test]
    fn test_authorize_accepts_only_the_configured_key() {
        let gate = gate();
        assert!(gate.authorize("test-admin-key"));
        assert!(!gate.authorize("test-admin-key "));
        assert!(!gate.authorize(""));
    }

    #[test]
    fn test_login_returns_shared_key_for_any_listed_account() {
        let gate = gate();
        assert_eq!(gate.login("admin@example.com", "registry-dev"), Some("test-admin-key"));
        assert_eq!(gate.login("family", "registry-2026"), Some("test-admin-key"));
    }

    #[test]
    fn test_login_rejects_mixed_credentials() {
        let gate = gate();
        assert_eq!(gate.login("admin@example.com", "registry-2026"), None);
        assert_eq!(gate.login("nobody", "registry-dev"), None);
    }
}
