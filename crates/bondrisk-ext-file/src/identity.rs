//! In-memory identity store.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use bondrisk_core::UserId;
use bondrisk_traits::identity::password_digest;
use bondrisk_traits::{IdentityStore, TraitError};

#[derive(Debug, Clone)]
struct UserRecord {
    id: UserId,
    digest: String,
}

/// In-memory [`IdentityStore`] keeping salted password digests.
pub struct InMemoryIdentityStore {
    by_name: DashMap<String, UserRecord>,
    names: DashMap<UserId, String>,
    next_id: AtomicI64,
}

impl InMemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            by_name: DashMap::new(),
            names: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// True if there are no users.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn resolve_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserId>, TraitError> {
        let digest = password_digest(username, password);
        Ok(self
            .by_name
            .get(username)
            .filter(|record| record.digest == digest)
            .map(|record| record.id))
    }

    async fn user_id(&self, username: &str) -> Result<Option<UserId>, TraitError> {
        Ok(self.by_name.get(username).map(|record| record.id))
    }

    async fn register(&self, username: &str, password: &str) -> Result<UserId, TraitError> {
        match self.by_name.entry(username.to_string()) {
            Entry::Occupied(_) => Err(TraitError::AlreadyExists(format!("user '{username}'"))),
            Entry::Vacant(slot) => {
                let id = UserId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                slot.insert(UserRecord {
                    id,
                    digest: password_digest(username, password),
                });
                self.names.insert(id, username.to_string());
                Ok(id)
            }
        }
    }

    async fn update_password(&self, user: UserId, new_password: &str) -> Result<bool, TraitError> {
        let Some(name) = self.names.get(&user).map(|n| n.clone()) else {
            return Ok(false);
        };
        match self.by_name.get_mut(&name) {
            Some(mut record) => {
                record.digest = password_digest(&name, new_password);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, user: UserId) -> Result<bool, TraitError> {
        match self.names.remove(&user) {
            Some((_, name)) => Ok(self.by_name.remove(&name).is_some()),
            None => Ok(false),
        }
    }
}
