//! Portfolio persistence.
//!
//! The engine treats the store as the source of truth for bond membership.
//! It never caches a portfolio across operations; every operation loads a
//! fresh snapshot.

use async_trait::async_trait;

use bondrisk_core::{Bond, BondId, NewBond, Portfolio, PortfolioId, UserId};

use crate::error::TraitError;

/// Portfolio and bond storage.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    /// Get a portfolio by id.
    async fn get(&self, id: PortfolioId) -> Result<Option<Portfolio>, TraitError>;

    /// Find a portfolio by owner and name.
    async fn find(&self, owner: UserId, name: &str) -> Result<Option<Portfolio>, TraitError>;

    /// List an owner's portfolios, ordered by id.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Portfolio>, TraitError>;

    /// Create an empty portfolio.
    ///
    /// Fails with [`TraitError::AlreadyExists`] if the owner already has a
    /// portfolio with this name.
    async fn create(&self, owner: UserId, name: &str) -> Result<Portfolio, TraitError>;

    /// Add a bond, assigning it a fresh id.
    ///
    /// Fails with [`TraitError::NotFound`] for an unknown portfolio.
    async fn add_bond(&self, id: PortfolioId, bond: NewBond) -> Result<Bond, TraitError>;

    /// Remove a bond. Returns `false` if the bond was not in the portfolio.
    ///
    /// Fails with [`TraitError::NotFound`] for an unknown portfolio.
    async fn remove_bond(&self, id: PortfolioId, bond: BondId) -> Result<bool, TraitError>;
}
