//! In-memory portfolio store.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use bondrisk_core::{Bond, BondId, NewBond, Portfolio, PortfolioId, UserId};
use bondrisk_traits::{PortfolioStore, TraitError};

/// In-memory [`PortfolioStore`].
///
/// Bond ids are unique across the store, so they are unique within every
/// portfolio.
pub struct InMemoryPortfolioStore {
    portfolios: DashMap<PortfolioId, Portfolio>,
    by_name: DashMap<(UserId, String), PortfolioId>,
    next_portfolio: AtomicI64,
    next_bond: AtomicI64,
}

impl InMemoryPortfolioStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            portfolios: DashMap::new(),
            by_name: DashMap::new(),
            next_portfolio: AtomicI64::new(1),
            next_bond: AtomicI64::new(1),
        }
    }

    /// Number of portfolios.
    pub fn len(&self) -> usize {
        self.portfolios.len()
    }

    /// True if there are no portfolios.
    pub fn is_empty(&self) -> bool {
        self.portfolios.is_empty()
    }
}

impl Default for InMemoryPortfolioStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortfolioStore for InMemoryPortfolioStore {
    async fn get(&self, id: PortfolioId) -> Result<Option<Portfolio>, TraitError> {
        Ok(self.portfolios.get(&id).map(|p| p.clone()))
    }

    async fn find(&self, owner: UserId, name: &str) -> Result<Option<Portfolio>, TraitError> {
        let Some(id) = self.by_name.get(&(owner, name.to_string())).map(|id| *id) else {
            return Ok(None);
        };
        self.get(id).await
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Portfolio>, TraitError> {
        let mut owned: Vec<Portfolio> = self
            .portfolios
            .iter()
            .filter(|p| p.owner == owner)
            .map(|p| p.clone())
            .collect();
        owned.sort_by_key(|p| p.id);
        Ok(owned)
    }

    async fn create(&self, owner: UserId, name: &str) -> Result<Portfolio, TraitError> {
        match self.by_name.entry((owner, name.to_string())) {
            Entry::Occupied(_) => Err(TraitError::AlreadyExists(format!(
                "portfolio '{name}' of user {owner}"
            ))),
            Entry::Vacant(slot) => {
                let id = PortfolioId::new(self.next_portfolio.fetch_add(1, Ordering::SeqCst));
                let portfolio = Portfolio::new(id, name, owner);
                self.portfolios.insert(id, portfolio.clone());
                slot.insert(id);
                Ok(portfolio)
            }
        }
    }

    async fn add_bond(&self, id: PortfolioId, bond: NewBond) -> Result<Bond, TraitError> {
        let mut portfolio = self
            .portfolios
            .get_mut(&id)
            .ok_or_else(|| TraitError::NotFound(format!("portfolio {id}")))?;
        let bond = bond.with_id(BondId::new(self.next_bond.fetch_add(1, Ordering::SeqCst)));
        portfolio.insert_bond(bond.clone());
        Ok(bond)
    }

    async fn remove_bond(&self, id: PortfolioId, bond: BondId) -> Result<bool, TraitError> {
        let mut portfolio = self
            .portfolios
            .get_mut(&id)
            .ok_or_else(|| TraitError::NotFound(format!("portfolio {id}")))?;
        Ok(portfolio.remove_bond(bond).is_some())
    }
}
