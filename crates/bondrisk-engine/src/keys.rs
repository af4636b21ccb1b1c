//! Cache keys, entity tags and TTL classes.
//!
//! A rendered key has the form `<metric>:<entity>[:<param-hash>]`. The
//! parameter hash is a truncated SHA3-256 of the request parameters that
//! influence the result, so two keys collide only when both the entity and
//! the parameters agree.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use bondrisk_core::{PortfolioId, ShockDirection, UserId};

/// Bytes of the SHA3 digest kept in a rendered key.
const PARAM_HASH_BYTES: usize = 8;

/// TTL class of a cached metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Rates and curves.
    MarketData,
    /// Credential resolution and user lookups.
    Identity,
    /// Portfolio views, risk and stress results.
    PortfolioDerived,
}

/// Cached metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Front-tenor rate of the live curve.
    CurrentRate,
    /// Curve points served for a bond.
    YieldCurve,
    /// Successful credential resolution.
    Credential,
    /// Username to id lookup.
    UserLookup,
    /// Portfolio with its valuation summary.
    PortfolioView,
    /// VaR and sensitivities.
    Risk,
    /// Parallel shock result.
    Stress,
}

impl Metric {
    /// Prefix used in rendered keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::CurrentRate => "current_rate",
            Metric::YieldCurve => "yield_curve",
            Metric::Credential => "credential",
            Metric::UserLookup => "user_id",
            Metric::PortfolioView => "portfolio",
            Metric::Risk => "risk",
            Metric::Stress => "stress",
        }
    }

    /// TTL class for this metric.
    pub fn ttl_class(&self) -> TtlClass {
        match self {
            Metric::CurrentRate | Metric::YieldCurve => TtlClass::MarketData,
            Metric::Credential | Metric::UserLookup => TtlClass::Identity,
            Metric::PortfolioView | Metric::Risk | Metric::Stress => TtlClass::PortfolioDerived,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entity a cached value depends on.
///
/// Invalidating a tag rejects every entry carrying it that was computed at
/// or before the invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityTag {
    /// A user and everything owned by them.
    User(UserId),
    /// A portfolio's holdings.
    Portfolio(PortfolioId),
    /// The live yield curve.
    Curve,
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityTag::User(id) => write!(f, "user.{id}"),
            EntityTag::Portfolio(id) => write!(f, "portfolio.{id}"),
            EntityTag::Curve => f.write_str("curve"),
        }
    }
}

/// A cache key with the tags its value depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    metric: Metric,
    entity: String,
    param_hash: Option<String>,
    tags: Vec<EntityTag>,
}

impl CacheKey {
    fn new(metric: Metric, entity: impl Into<String>, params: Option<&[&str]>) -> Self {
        Self {
            metric,
            entity: entity.into(),
            param_hash: params.map(param_hash),
            tags: Vec::new(),
        }
    }

    /// Front-tenor rate of the live curve.
    pub fn current_rate() -> Self {
        Self::new(Metric::CurrentRate, "live", None).with_tag(EntityTag::Curve)
    }

    /// Curve served for `bond_name`.
    pub fn yield_curve(bond_name: &str) -> Self {
        Self::new(Metric::YieldCurve, "bond", Some(&[bond_name])).with_tag(EntityTag::Curve)
    }

    /// Credential resolution for a username/password pair.
    ///
    /// The user tag is only known after resolution; add it with
    /// [`CacheKey::with_tag`] before writing.
    pub fn credential(username: &str, password: &str) -> Self {
        Self::new(Metric::Credential, "identity", Some(&[username, password]))
    }

    /// Username lookup.
    pub fn user_lookup(username: &str) -> Self {
        Self::new(Metric::UserLookup, "identity", Some(&[username]))
    }

    /// A user's named portfolio and its valuation.
    pub fn portfolio_view(user: UserId, name: &str) -> Self {
        Self::new(Metric::PortfolioView, EntityTag::User(user).to_string(), Some(&[name]))
            .with_tag(EntityTag::User(user))
            .with_tag(EntityTag::Curve)
    }

    /// Risk figures of a portfolio.
    pub fn risk(portfolio: PortfolioId) -> Self {
        Self::new(Metric::Risk, EntityTag::Portfolio(portfolio).to_string(), None)
            .with_tag(EntityTag::Portfolio(portfolio))
            .with_tag(EntityTag::Curve)
    }

    /// Stress result of a portfolio for one shock.
    pub fn stress(portfolio: PortfolioId, shock_bps: i32, direction: ShockDirection) -> Self {
        let bps = shock_bps.to_string();
        Self::new(
            Metric::Stress,
            EntityTag::Portfolio(portfolio).to_string(),
            Some(&[bps.as_str(), direction.as_str()]),
        )
        .with_tag(EntityTag::Portfolio(portfolio))
        .with_tag(EntityTag::Curve)
    }

    /// Add a dependency tag.
    pub fn with_tag(mut self, tag: EntityTag) -> Self {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// The metric.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Dependency tags.
    pub fn tags(&self) -> &[EntityTag] {
        &self.tags
    }

    /// The backend key string.
    pub fn render(&self) -> String {
        match &self.param_hash {
            Some(hash) => format!("{}:{}:{}", self.metric, self.entity, hash),
            None => format!("{}:{}", self.metric, self.entity),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Truncated SHA3-256 over NUL-separated parameters.
fn param_hash(params: &[&str]) -> String {
    let mut hasher = Sha3_256::new();
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(p.as_bytes());
    }
    hex::encode(&hasher.finalize()[..PARAM_HASH_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_shape() {
        assert_eq!(CacheKey::current_rate().render(), "current_rate:live");
        assert_eq!(
            CacheKey::risk(PortfolioId::new(42)).render(),
            "risk:portfolio.42"
        );

        let key = CacheKey::stress(PortfolioId::new(42), 100, ShockDirection::Up).render();
        let parts: Vec<&str> = key.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "stress");
        assert_eq!(parts[1], "portfolio.42");
        assert_eq!(parts[2].len(), PARAM_HASH_BYTES * 2);
    }

    #[test]
    fn test_params_distinguish_keys() {
        let p = PortfolioId::new(1);
        assert_ne!(
            CacheKey::stress(p, 100, ShockDirection::Up),
            CacheKey::stress(p, 100, ShockDirection::Down)
        );
        assert_ne!(
            CacheKey::stress(p, 100, ShockDirection::Up).render(),
            CacheKey::stress(p, 10, ShockDirection::Up).render()
        );
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(
            CacheKey::credential("ab", "c").render(),
            CacheKey::credential("a", "bc").render()
        );
    }

    #[test]
    fn test_param_hash_is_truncated_sha3_hex() {
        let expected = hex::encode(&Sha3_256::digest(b"alice\0pw")[..PARAM_HASH_BYTES]);
        assert_eq!(param_hash(&["alice", "pw"]), expected);
        assert_eq!(
            CacheKey::credential("alice", "pw").render(),
            format!("credential:identity:{expected}")
        );
    }

    #[test]
    fn test_tags() {
        let key = CacheKey::portfolio_view(UserId::new(7), "Default");
        assert_eq!(key.tags(), &[EntityTag::User(UserId::new(7)), EntityTag::Curve]);

        let key = CacheKey::credential("alice", "pw")
            .with_tag(EntityTag::User(UserId::new(1)))
            .with_tag(EntityTag::User(UserId::new(1)));
        assert_eq!(key.tags().len(), 1);
    }

    #[test]
    fn test_ttl_classes() {
        assert_eq!(Metric::CurrentRate.ttl_class(), TtlClass::MarketData);
        assert_eq!(Metric::Credential.ttl_class(), TtlClass::Identity);
        assert_eq!(Metric::Stress.ttl_class(), TtlClass::PortfolioDerived);
    }

    #[test]
    fn test_password_not_in_key() {
        let key = CacheKey::credential("alice", "hunter2").render();
        assert!(!key.contains("hunter2"));
        assert!(!key.contains("alice"));
    }
}
