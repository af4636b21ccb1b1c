//! # Bondrisk Ext Redb
//!
//! Embedded storage for bondrisk using redb.
//!
//! - [`RedbPortfolioStore`]: portfolios with their bonds, one JSON row each
//! - [`RedbIdentityStore`]: users with salted password digests
//!
//! Uniqueness checks and id allocation happen inside a single write
//! transaction, so concurrent creates cannot hand out duplicates.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use bondrisk_core::{Bond, BondId, NewBond, Portfolio, PortfolioId, UserId};
use bondrisk_traits::identity::password_digest;
use bondrisk_traits::{IdentityStore, PortfolioStore, TraitError};

// Table definitions
const PORTFOLIOS: TableDefinition<i64, &[u8]> = TableDefinition::new("portfolios");
const PORTFOLIO_NAMES: TableDefinition<(i64, &str), i64> = TableDefinition::new("portfolio_names");
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const USER_NAMES: TableDefinition<i64, &str> = TableDefinition::new("user_names");
const COUNTERS: TableDefinition<&str, i64> = TableDefinition::new("counters");

fn db_err(e: impl Display) -> TraitError {
    TraitError::DatabaseError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TraitError> {
    serde_json::to_vec(value).map_err(|e| TraitError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TraitError> {
    serde_json::from_slice(bytes).map_err(|e| TraitError::ParseError(e.to_string()))
}

/// Allocate the next id from a named counter. Ids start at 1.
fn next_id(counters: &mut redb::Table<'_, &'static str, i64>, name: &str) -> Result<i64, TraitError> {
    let current = counters
        .get(name)
        .map_err(db_err)?
        .map(|v| v.value())
        .unwrap_or(1);
    counters.insert(name, current + 1).map_err(db_err)?;
    Ok(current)
}

// =============================================================================
// PORTFOLIOS
// =============================================================================

/// Redb-based portfolio store.
pub struct RedbPortfolioStore {
    db: Arc<Database>,
}

impl RedbPortfolioStore {
    /// Create a new redb portfolio store.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PortfolioStore for RedbPortfolioStore {
    async fn get(&self, id: PortfolioId) -> Result<Option<Portfolio>, TraitError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;

        let table = match read_txn.open_table(PORTFOLIOS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(db_err(e)),
        };

        match table.get(id.get()).map_err(db_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    async fn find(&self, owner: UserId, name: &str) -> Result<Option<Portfolio>, TraitError> {
        let id = {
            let read_txn = self.db.begin_read().map_err(db_err)?;
            let names = match read_txn.open_table(PORTFOLIO_NAMES) {
                Ok(t) => t,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(db_err(e)),
            };
            let id = names.get((owner.get(), name)).map_err(db_err)?.map(|v| v.value());
            id
        };

        match id {
            Some(id) => self.get(PortfolioId::new(id)).await,
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Portfolio>, TraitError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;

        let table = match read_txn.open_table(PORTFOLIOS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(vec![]),
            Err(e) => return Err(db_err(e)),
        };

        let mut owned = Vec::new();
        for result in table.iter().map_err(db_err)? {
            let (_, value) = result.map_err(db_err)?;
            let portfolio: Portfolio = decode(value.value())?;
            if portfolio.owner == owner {
                owned.push(portfolio);
            }
        }
        Ok(owned)
    }

    async fn create(&self, owner: UserId, name: &str) -> Result<Portfolio, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let portfolio = {
            let mut names = write_txn.open_table(PORTFOLIO_NAMES).map_err(db_err)?;
            if names.get((owner.get(), name)).map_err(db_err)?.is_some() {
                return Err(TraitError::AlreadyExists(format!(
                    "portfolio '{name}' of user {owner}"
                )));
            }

            let mut counters = write_txn.open_table(COUNTERS).map_err(db_err)?;
            let id = PortfolioId::new(next_id(&mut counters, "portfolio")?);
            let portfolio = Portfolio::new(id, name, owner);

            let mut rows = write_txn.open_table(PORTFOLIOS).map_err(db_err)?;
            rows.insert(id.get(), encode(&portfolio)?.as_slice())
                .map_err(db_err)?;
            names.insert((owner.get(), name), id.get()).map_err(db_err)?;
            portfolio
        };
        write_txn.commit().map_err(db_err)?;
        Ok(portfolio)
    }

    async fn add_bond(&self, id: PortfolioId, bond: NewBond) -> Result<Bond, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let bond = {
            let mut rows = write_txn.open_table(PORTFOLIOS).map_err(db_err)?;
            let mut portfolio: Portfolio = match rows.get(id.get()).map_err(db_err)? {
                Some(data) => decode(data.value())?,
                None => return Err(TraitError::NotFound(format!("portfolio {id}"))),
            };

            let mut counters = write_txn.open_table(COUNTERS).map_err(db_err)?;
            let bond = bond.with_id(BondId::new(next_id(&mut counters, "bond")?));
            portfolio.insert_bond(bond.clone());
            rows.insert(id.get(), encode(&portfolio)?.as_slice())
                .map_err(db_err)?;
            bond
        };
        write_txn.commit().map_err(db_err)?;
        Ok(bond)
    }

    async fn remove_bond(&self, id: PortfolioId, bond: BondId) -> Result<bool, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut rows = write_txn.open_table(PORTFOLIOS).map_err(db_err)?;
            let mut portfolio: Portfolio = match rows.get(id.get()).map_err(db_err)? {
                Some(data) => decode(data.value())?,
                None => return Err(TraitError::NotFound(format!("portfolio {id}"))),
            };

            if portfolio.remove_bond(bond).is_none() {
                return Ok(false);
            }
            rows.insert(id.get(), encode(&portfolio)?.as_slice())
                .map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(true)
    }
}

// =============================================================================
// IDENTITIES
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    id: i64,
    digest: String,
}

/// Redb-based identity store.
pub struct RedbIdentityStore {
    db: Arc<Database>,
}

impl RedbIdentityStore {
    /// Create a new redb identity store.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row(&self, username: &str) -> Result<Option<UserRow>, TraitError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;

        let table = match read_txn.open_table(USERS) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(db_err(e)),
        };

        match table.get(username).map_err(db_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl IdentityStore for RedbIdentityStore {
    async fn resolve_credential(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserId>, TraitError> {
        let digest = password_digest(username, password);
        Ok(self
            .row(username)?
            .filter(|row| row.digest == digest)
            .map(|row| UserId::new(row.id)))
    }

    async fn user_id(&self, username: &str) -> Result<Option<UserId>, TraitError> {
        Ok(self.row(username)?.map(|row| UserId::new(row.id)))
    }

    async fn register(&self, username: &str, password: &str) -> Result<UserId, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let id = {
            let mut users = write_txn.open_table(USERS).map_err(db_err)?;
            if users.get(username).map_err(db_err)?.is_some() {
                return Err(TraitError::AlreadyExists(format!("user '{username}'")));
            }

            let mut counters = write_txn.open_table(COUNTERS).map_err(db_err)?;
            let id = next_id(&mut counters, "user")?;
            let row = UserRow {
                id,
                digest: password_digest(username, password),
            };
            users
                .insert(username, encode(&row)?.as_slice())
                .map_err(db_err)?;

            let mut names = write_txn.open_table(USER_NAMES).map_err(db_err)?;
            names.insert(id, username).map_err(db_err)?;
            id
        };
        write_txn.commit().map_err(db_err)?;
        Ok(UserId::new(id))
    }

    async fn update_password(&self, user: UserId, new_password: &str) -> Result<bool, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let names = write_txn.open_table(USER_NAMES).map_err(db_err)?;
            let Some(username) = names.get(user.get()).map_err(db_err)?.map(|v| v.value().to_string())
            else {
                return Ok(false);
            };

            let mut users = write_txn.open_table(USERS).map_err(db_err)?;
            let mut row: UserRow = match users.get(username.as_str()).map_err(db_err)? {
                Some(data) => decode(data.value())?,
                None => return Ok(false),
            };
            row.digest = password_digest(&username, new_password);
            users
                .insert(username.as_str(), encode(&row)?.as_slice())
                .map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(true)
    }

    async fn delete_user(&self, user: UserId) -> Result<bool, TraitError> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let deleted = {
            let mut names = write_txn.open_table(USER_NAMES).map_err(db_err)?;
            let username = names
                .remove(user.get())
                .map_err(db_err)?
                .map(|v| v.value().to_string());

            match username {
                Some(username) => {
                    let mut users = write_txn.open_table(USERS).map_err(db_err)?;
                    let removed = users.remove(username.as_str()).map_err(db_err)?.is_some();
                    removed
                }
                None => false,
            }
        };
        write_txn.commit().map_err(db_err)?;
        Ok(deleted)
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Redb-backed stores sharing one database file.
pub struct RedbStores {
    /// Portfolio store.
    pub portfolios: Arc<RedbPortfolioStore>,
    /// Identity store.
    pub identity: Arc<RedbIdentityStore>,
}

/// Open (or create) a database at `path` and build both stores on it.
pub fn create_redb_stores(path: impl AsRef<Path>) -> Result<RedbStores, TraitError> {
    let db = Arc::new(Database::create(path).map_err(db_err)?);

    Ok(RedbStores {
        portfolios: Arc::new(RedbPortfolioStore::new(db.clone())),
        identity: Arc::new(RedbIdentityStore::new(db)),
    })
}

/// Create stores on a fresh file in the system temp directory.
pub fn create_temp_stores() -> Result<RedbStores, TraitError> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_path = std::env::temp_dir().join(format!(
        "bondrisk_{}_{}.redb",
        std::process::id(),
        id
    ));

    create_redb_stores(&db_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn stores() -> (tempfile::TempDir, RedbStores) {
        let dir = tempfile::tempdir().unwrap();
        let stores = create_redb_stores(dir.path().join("bondrisk.redb")).unwrap();
        (dir, stores)
    }

    fn bond(name: &str) -> NewBond {
        NewBond {
            name: name.to_string(),
            coupon: dec!(0.0375),
            maturity: NaiveDate::from_ymd_opt(2033, 8, 15).unwrap(),
            price: dec!(97.25),
            quantity: 12,
        }
    }

    #[tokio::test]
    async fn test_empty_database_reads() {
        let (_dir, stores) = stores();
        assert!(stores.portfolios.get(PortfolioId::new(1)).await.unwrap().is_none());
        assert!(stores
            .portfolios
            .find(UserId::new(1), "Default")
            .await
            .unwrap()
            .is_none());
        assert!(stores.portfolios.list_by_owner(UserId::new(1)).await.unwrap().is_empty());
        assert!(stores.identity.user_id("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_portfolio_roundtrip() {
        let (_dir, stores) = stores();
        let owner = UserId::new(3);
        let p = stores.portfolios.create(owner, "Default").await.unwrap();
        assert!(matches!(
            stores.portfolios.create(owner, "Default").await,
            Err(TraitError::AlreadyExists(_))
        ));

        let a = stores.portfolios.add_bond(p.id, bond("A")).await.unwrap();
        let b = stores.portfolios.add_bond(p.id, bond("B")).await.unwrap();
        assert_ne!(a.id, b.id);

        let found = stores.portfolios.find(owner, "Default").await.unwrap().unwrap();
        assert_eq!(found.bonds, vec![a.clone(), b.clone()]);
        assert_eq!(found.bonds[0].coupon, dec!(0.0375));

        assert!(stores.portfolios.remove_bond(p.id, a.id).await.unwrap());
        assert!(!stores.portfolios.remove_bond(p.id, a.id).await.unwrap());
        let reloaded = stores.portfolios.get(p.id).await.unwrap().unwrap();
        assert_eq!(reloaded.bonds, vec![b]);

        assert!(matches!(
            stores.portfolios.add_bond(PortfolioId::new(77), bond("C")).await,
            Err(TraitError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_owner() {
        let (_dir, stores) = stores();
        stores.portfolios.create(UserId::new(1), "A").await.unwrap();
        stores.portfolios.create(UserId::new(2), "A").await.unwrap();
        stores.portfolios.create(UserId::new(1), "B").await.unwrap();

        let names: Vec<String> = stores
            .portfolios
            .list_by_owner(UserId::new(1))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_identity_lifecycle() {
        let (_dir, stores) = stores();
        let id = stores.identity.register("alice", "pw").await.unwrap();
        assert!(matches!(
            stores.identity.register("alice", "pw2").await,
            Err(TraitError::AlreadyExists(_))
        ));

        assert_eq!(stores.identity.resolve_credential("alice", "pw").await.unwrap(), Some(id));
        assert_eq!(stores.identity.resolve_credential("alice", "no").await.unwrap(), None);

        assert!(stores.identity.update_password(id, "pw2").await.unwrap());
        assert_eq!(stores.identity.resolve_credential("alice", "pw").await.unwrap(), None);
        assert_eq!(stores.identity.resolve_credential("alice", "pw2").await.unwrap(), Some(id));

        assert!(stores.identity.delete_user(id).await.unwrap());
        assert!(!stores.identity.delete_user(id).await.unwrap());
        assert!(!stores.identity.update_password(id, "x").await.unwrap());
        assert_eq!(stores.identity.user_id("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bondrisk.redb");

        let (user, pid) = {
            let stores = create_redb_stores(&path).unwrap();
            let user = stores.identity.register("bob", "pw").await.unwrap();
            let p = stores.portfolios.create(user, "Default").await.unwrap();
            stores.portfolios.add_bond(p.id, bond("A")).await.unwrap();
            (user, p.id)
        };

        let stores = create_redb_stores(&path).unwrap();
        assert_eq!(stores.identity.user_id("bob").await.unwrap(), Some(user));
        let p = stores.portfolios.get(pid).await.unwrap().unwrap();
        assert_eq!(p.owner, user);
        assert_eq!(p.bonds.len(), 1);

        // Counters continue where they left off.
        let next = stores.portfolios.create(user, "Second").await.unwrap();
        assert!(next.id > pid);
    }
}
