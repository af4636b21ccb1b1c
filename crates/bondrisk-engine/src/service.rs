//! The risk service.
//!
//! Every operation follows the same pattern: resolve the key, serve a fresh
//! cached value if there is one, otherwise load a fresh snapshot from the
//! stores, take one curve snapshot and compute. Mutations write through to
//! the store and invalidate the affected tags before returning.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use bondrisk_analytics::{PortfolioValuation, RiskCalculator, YieldCurveProvider};
use bondrisk_core::{
    Bond, BondId, CurrentRate, CurvePoint, NewBond, Portfolio, PortfolioId, RiskError, RiskResult,
    ShockDirection, StressResult, UserId, YieldCurve,
};
use bondrisk_traits::{CurveSource, IdentityStore, PortfolioStore};

use crate::cache::{CacheCoordinator, CacheStats};
use crate::clock::Clock;
use crate::error::EngineError;
use crate::export;
use crate::keys::{CacheKey, EntityTag};

/// Name given to a portfolio created without one.
pub const DEFAULT_PORTFOLIO_NAME: &str = "Default";

/// Curve served for a bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldCurveView {
    /// The bond the curve was requested for.
    pub bond_name: String,
    /// Name of the live curve.
    pub curve_name: String,
    /// Curve as-of date.
    pub as_of: NaiveDate,
    /// Curve points in tenor order.
    pub points: Vec<CurvePoint>,
}

/// A portfolio with its derived aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioView {
    /// Holdings.
    pub portfolio: Portfolio,
    /// Total value, average yield, average duration, total DV01.
    pub valuation: PortfolioValuation,
    /// As-of date of the curve used.
    pub curve_as_of: NaiveDate,
    /// When the computation started.
    pub calculated_at: DateTime<Utc>,
}

/// Service health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Always true while the process serves requests.
    pub healthy: bool,
    /// Crate version.
    pub version: String,
    /// Seconds since the service was built.
    pub uptime_secs: i64,
    /// Live curve name.
    pub curve_name: String,
    /// Live curve as-of date.
    pub curve_as_of: NaiveDate,
    /// When the live curve was installed.
    pub curve_updated_at: DateTime<Utc>,
    /// Cache backend name.
    pub cache_backend: String,
    /// Cache counters.
    pub cache: CacheStats,
}

/// Cache-coordinated risk analytics over portfolio and identity stores.
pub struct RiskService {
    identity: Arc<dyn IdentityStore>,
    portfolios: Arc<dyn PortfolioStore>,
    curves: Arc<YieldCurveProvider>,
    calculator: RiskCalculator,
    cache: CacheCoordinator,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
}

impl RiskService {
    pub(crate) fn new(
        identity: Arc<dyn IdentityStore>,
        portfolios: Arc<dyn PortfolioStore>,
        curves: Arc<YieldCurveProvider>,
        calculator: RiskCalculator,
        cache: CacheCoordinator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            identity,
            portfolios,
            curves,
            calculator,
            cache,
            clock,
            started_at,
        }
    }

    /// The live curve provider.
    pub fn curves(&self) -> &Arc<YieldCurveProvider> {
        &self.curves
    }

    /// The cache coordinator.
    pub fn cache(&self) -> &CacheCoordinator {
        &self.cache
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Resolve a username/password pair to a user id.
    ///
    /// Only successful resolutions are cached, tagged with the user so a
    /// password change or deletion rejects them.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<UserId, EngineError> {
        let key = CacheKey::credential(username, password);
        if let Some(user) = self.cache.get::<UserId>(&key).await {
            return Ok(user);
        }

        let ticket = self.cache.begin();
        let user = self.resolve(username, password).await?;
        self.cache
            .put(&key.with_tag(EntityTag::User(user)), &user, ticket)
            .await;
        Ok(user)
    }

    /// Create a user.
    #[instrument(skip(self, password))]
    pub async fn register_user(&self, username: &str, password: &str) -> Result<UserId, EngineError> {
        if username.trim().is_empty() {
            return Err(EngineError::invalid("username must not be empty"));
        }
        if password.is_empty() {
            return Err(EngineError::invalid("password must not be empty"));
        }

        let user = self.identity.register(username, password).await?;
        info!(user = %user, "registered user");
        Ok(user)
    }

    /// Delete a user after re-checking their credentials.
    ///
    /// Portfolios owned by the user are left in place.
    #[instrument(skip(self, password))]
    pub async fn delete_user(&self, username: &str, password: &str) -> Result<UserId, EngineError> {
        let user = self.resolve(username, password).await?;
        if !self.identity.delete_user(user).await? {
            return Err(EngineError::NotFound(format!("user {user}")));
        }

        self.cache.invalidate(&[EntityTag::User(user)]).await;
        info!(user = %user, "deleted user");
        Ok(user)
    }

    /// Replace a user's password after re-checking the current one.
    #[instrument(skip(self, password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        password: &str,
        new_password: &str,
    ) -> Result<UserId, EngineError> {
        if new_password.is_empty() {
            return Err(EngineError::invalid("new password must not be empty"));
        }

        let user = self.resolve(username, password).await?;
        if !self.identity.update_password(user, new_password).await? {
            return Err(EngineError::NotFound(format!("user {user}")));
        }

        self.cache.invalidate(&[EntityTag::User(user)]).await;
        info!(user = %user, "changed password");
        Ok(user)
    }

    /// Look up a user id by username.
    #[instrument(skip(self))]
    pub async fn get_user_id(&self, username: &str) -> Result<UserId, EngineError> {
        let key = CacheKey::user_lookup(username);
        if let Some(user) = self.cache.get::<UserId>(&key).await {
            return Ok(user);
        }

        let ticket = self.cache.begin();
        let user = self
            .identity
            .user_id(username)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user '{username}'")))?;
        self.cache
            .put(&key.with_tag(EntityTag::User(user)), &user, ticket)
            .await;
        Ok(user)
    }

    async fn resolve(&self, username: &str, password: &str) -> Result<UserId, EngineError> {
        match self.identity.resolve_credential(username, password).await? {
            Some(user) => Ok(user),
            None => {
                debug!(username, "credential rejected");
                Err(EngineError::InvalidCredentials)
            }
        }
    }

    // =========================================================================
    // Market data
    // =========================================================================

    /// Yield at the shortest tenor of the live curve.
    #[instrument(skip(self))]
    pub async fn get_current_rate(&self) -> Result<CurrentRate, EngineError> {
        self.cache
            .get_or_compute(&CacheKey::current_rate(), || async move {
                let (curve, installed_at) = self.curves.snapshot();
                let front = curve
                    .points()
                    .first()
                    .ok_or_else(|| RiskError::insufficient_data("live curve has no points"))?;
                Ok::<_, EngineError>(CurrentRate {
                    rate: front.rate,
                    tenor: front.tenor,
                    last_updated: installed_at,
                })
            })
            .await
    }

    /// The live curve, as served for `bond_name`.
    #[instrument(skip(self))]
    pub async fn get_yield_curve(&self, bond_name: &str) -> Result<YieldCurveView, EngineError> {
        if bond_name.trim().is_empty() {
            return Err(EngineError::invalid("bond name must not be empty"));
        }

        self.cache
            .get_or_compute(&CacheKey::yield_curve(bond_name), || async move {
                let curve = self.curves.current();
                Ok::<_, EngineError>(YieldCurveView {
                    bond_name: bond_name.to_string(),
                    curve_name: curve.name().to_string(),
                    as_of: curve.as_of(),
                    points: curve.points().to_vec(),
                })
            })
            .await
    }

    /// Install a new live curve and invalidate everything that depends on it.
    #[instrument(skip(self, curve), fields(curve = curve.name()))]
    pub async fn refresh_curve(&self, curve: YieldCurve) -> Result<(), EngineError> {
        self.curves.replace(curve, self.clock.now())?;
        self.cache.invalidate(&[EntityTag::Curve]).await;
        info!("live curve refreshed");
        Ok(())
    }

    /// Pull the latest curve from `source` and install it.
    ///
    /// A failing source leaves the current curve in place.
    pub async fn refresh_from(&self, source: &dyn CurveSource) -> Result<(), EngineError> {
        let curve = source.latest_curve().await.map_err(|e| {
            warn!(source = source.source_name(), error = %e, "curve source failed");
            EngineError::from(e)
        })?;
        self.refresh_curve(curve).await
    }

    // =========================================================================
    // Portfolios
    // =========================================================================

    /// A user's named portfolio with its aggregates.
    #[instrument(skip(self))]
    pub async fn get_portfolio(&self, user: UserId, name: &str) -> Result<PortfolioView, EngineError> {
        let name = name.trim();
        self.cache
            .get_or_compute(&CacheKey::portfolio_view(user, name), || async move {
                let started = self.clock.now();
                let portfolio = self
                    .portfolios
                    .find(user, name)
                    .await?
                    .ok_or_else(|| {
                        EngineError::NotFound(format!("portfolio '{name}' of user {user}"))
                    })?;
                let curve = self.curves.current();
                let valuation = self.calculator.valuation(&portfolio, &curve)?;
                Ok::<_, EngineError>(PortfolioView {
                    portfolio,
                    valuation,
                    curve_as_of: curve.as_of(),
                    calculated_at: started,
                })
            })
            .await
    }

    /// Create an empty portfolio, named [`DEFAULT_PORTFOLIO_NAME`] when no
    /// name is given.
    #[instrument(skip(self))]
    pub async fn create_portfolio(
        &self,
        user: UserId,
        name: Option<&str>,
    ) -> Result<Portfolio, EngineError> {
        let name = match name.map(str::trim) {
            Some("") => return Err(EngineError::invalid("portfolio name must not be empty")),
            Some(n) => n,
            None => DEFAULT_PORTFOLIO_NAME,
        };

        let portfolio = self.portfolios.create(user, name).await?;
        self.cache.invalidate(&[EntityTag::User(user)]).await;
        info!(portfolio = %portfolio.id, user = %user, name, "created portfolio");
        Ok(portfolio)
    }

    /// Add a bond to a portfolio.
    #[instrument(skip(self, bond), fields(bond = %bond.name))]
    pub async fn add_bond(&self, portfolio: PortfolioId, bond: NewBond) -> Result<Bond, EngineError> {
        bond.validate()?;
        let owner = self.load(portfolio).await?.owner;

        let added = self.portfolios.add_bond(portfolio, bond).await?;
        self.cache
            .invalidate(&[EntityTag::Portfolio(portfolio), EntityTag::User(owner)])
            .await;
        info!(portfolio = %portfolio, bond_id = %added.id, "added bond");
        Ok(added)
    }

    /// Remove a bond from a portfolio.
    #[instrument(skip(self))]
    pub async fn remove_bond(&self, portfolio: PortfolioId, bond: BondId) -> Result<(), EngineError> {
        let owner = self.load(portfolio).await?.owner;

        if !self.portfolios.remove_bond(portfolio, bond).await? {
            return Err(EngineError::NotFound(format!(
                "bond {bond} in portfolio {portfolio}"
            )));
        }
        self.cache
            .invalidate(&[EntityTag::Portfolio(portfolio), EntityTag::User(owner)])
            .await;
        info!(portfolio = %portfolio, bond_id = %bond, "removed bond");
        Ok(())
    }

    async fn load(&self, id: PortfolioId) -> Result<Portfolio, EngineError> {
        self.portfolios
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("portfolio {id}")))
    }

    // =========================================================================
    // Risk
    // =========================================================================

    /// P&L of a portfolio under a parallel curve shock.
    #[instrument(skip(self))]
    pub async fn run_stress_test(
        &self,
        portfolio: PortfolioId,
        shock_bps: i32,
        direction: ShockDirection,
    ) -> Result<StressResult, EngineError> {
        if shock_bps < 0 {
            return Err(EngineError::invalid(format!(
                "shock must be a non-negative number of basis points, got {shock_bps}"
            )));
        }

        self.cache
            .get_or_compute(
                &CacheKey::stress(portfolio, shock_bps, direction),
                || async move {
                    let started = self.clock.now();
                    let holdings = self.load(portfolio).await?;
                    let curve = self.curves.current();
                    Ok::<_, EngineError>(self
                        .calculator
                        .stress(&holdings, &curve, shock_bps, direction, started)?)
                },
            )
            .await
    }

    /// VaR and sensitivities of a portfolio.
    #[instrument(skip(self))]
    pub async fn calculate_risk(&self, portfolio: PortfolioId) -> Result<RiskResult, EngineError> {
        self.cache
            .get_or_compute(&CacheKey::risk(portfolio), || async move {
                let started = self.clock.now();
                let holdings = self.load(portfolio).await?;
                let curve = self.curves.current();
                Ok::<_, EngineError>(self.calculator.risk(&holdings, &curve, started)?)
            })
            .await
    }

    // =========================================================================
    // Export and status
    // =========================================================================

    /// All of a user's bonds as CSV.
    #[instrument(skip(self))]
    pub async fn export_portfolio_csv(&self, user: UserId) -> Result<Vec<u8>, EngineError> {
        let portfolios = self.portfolios.list_by_owner(user).await?;
        let mut out = Vec::new();
        export::write_portfolio_csv(&mut out, &portfolios)?;
        debug!(portfolios = portfolios.len(), bytes = out.len(), "exported csv");
        Ok(out)
    }

    /// Health, uptime and cache counters.
    pub fn status(&self) -> ServiceStatus {
        let (curve, updated_at) = self.curves.snapshot();
        ServiceStatus {
            healthy: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: (self.clock.now() - self.started_at).num_seconds(),
            curve_name: curve.name().to_string(),
            curve_as_of: curve.as_of(),
            curve_updated_at: updated_at,
            cache_backend: self.cache.backend_name().to_string(),
            cache: self.cache.stats(),
        }
    }
}
