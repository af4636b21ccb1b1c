//! Identity collaborator.
//!
//! The engine only needs a stable integer [`UserId`] per identity. How
//! credentials are stored is up to the implementation; the helpers here give
//! every bundled store the same digest format.

use async_trait::async_trait;
use sha3::{Digest, Sha3_256};

use bondrisk_core::UserId;

use crate::error::TraitError;

/// Credential resolution and user lifecycle.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Resolve a username/password pair. `None` when the pair does not match.
    async fn resolve_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserId>, TraitError>;

    /// Look up a user id by username.
    async fn user_id(&self, username: &str) -> Result<Option<UserId>, TraitError>;

    /// Create a user. Fails with [`TraitError::AlreadyExists`] for a taken username.
    async fn register(&self, username: &str, password: &str) -> Result<UserId, TraitError>;

    /// Replace a user's password. Returns `false` if the user does not exist.
    async fn update_password(&self, user: UserId, new_password: &str) -> Result<bool, TraitError>;

    /// Delete a user. Returns `false` if the user does not exist.
    async fn delete_user(&self, user: UserId) -> Result<bool, TraitError>;
}

/// Salted SHA3-256 digest of a password, hex encoded.
///
/// The username is the salt, so equal passwords of different users never
/// share a digest.
pub fn password_digest(username: &str, password: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(username.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_salted_by_username() {
        let a = password_digest("alice", "secret");
        let b = password_digest("bob", "secret");
        assert_ne!(a, b);
        assert_eq!(a, password_digest("alice", "secret"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        let digest = password_digest("alice", "secret");
        assert!(digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(hex::decode(&digest).unwrap().len(), 32);
    }
}
