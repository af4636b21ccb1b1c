//! Bond and portfolio reference data.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;
use crate::ids::{BondId, PortfolioId, UserId};

/// A fixed-coupon bond position held in a portfolio.
///
/// `coupon` is an annual rate as a decimal fraction (`0.05` = 5%).
/// `price` is the quoted clean price per 100 face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    /// Bond identifier.
    pub id: BondId,
    /// Display name.
    pub name: String,
    /// Annual coupon rate.
    pub coupon: Decimal,
    /// Final maturity date.
    pub maturity: NaiveDate,
    /// Quoted clean price per 100 face.
    pub price: Decimal,
    /// Number of bonds held.
    pub quantity: i64,
}

impl Bond {
    /// Coupon rate as `f64`.
    pub fn coupon_rate(&self) -> f64 {
        self.coupon.to_f64().unwrap_or(0.0)
    }

    /// Quantity as `f64`.
    pub fn quantity_f64(&self) -> f64 {
        self.quantity as f64
    }
}

/// Bond terms supplied by a caller before an identifier is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBond {
    /// Display name.
    pub name: String,
    /// Annual coupon rate.
    pub coupon: Decimal,
    /// Final maturity date.
    pub maturity: NaiveDate,
    /// Quoted clean price per 100 face.
    pub price: Decimal,
    /// Number of bonds held.
    pub quantity: i64,
}

impl NewBond {
    /// Reject terms that cannot be valued.
    pub fn validate(&self) -> Result<(), RiskError> {
        if self.name.trim().is_empty() {
            return Err(RiskError::invalid_argument("bond name must not be empty"));
        }
        if self.coupon.is_sign_negative() {
            return Err(RiskError::invalid_argument(format!(
                "coupon must be non-negative, got {}",
                self.coupon
            )));
        }
        if self.price.is_sign_negative() {
            return Err(RiskError::invalid_argument(format!(
                "price must be non-negative, got {}",
                self.price
            )));
        }
        if self.quantity <= 0 {
            return Err(RiskError::invalid_argument(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }

    /// Attach an identifier.
    pub fn with_id(self, id: BondId) -> Bond {
        Bond {
            id,
            name: self.name,
            coupon: self.coupon,
            maturity: self.maturity,
            price: self.price,
            quantity: self.quantity,
        }
    }
}

/// A named set of bonds owned by a single user.
///
/// Aggregates (total value, average yield, ...) are deliberately absent:
/// they are recomputed from `bonds` and the live curve on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Portfolio identifier.
    pub id: PortfolioId,
    /// Portfolio name, unique per owner.
    pub name: String,
    /// Owning user.
    pub owner: UserId,
    /// Held bonds; membership matters, order does not.
    pub bonds: Vec<Bond>,
}

impl Portfolio {
    /// Create an empty portfolio.
    pub fn new(id: PortfolioId, name: impl Into<String>, owner: UserId) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            bonds: Vec::new(),
        }
    }

    /// True when the portfolio holds no bonds.
    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Look up a bond by id.
    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.iter().find(|b| b.id == id)
    }

    /// Add a bond, replacing any existing bond with the same id.
    pub fn insert_bond(&mut self, bond: Bond) {
        match self.bonds.iter_mut().find(|b| b.id == bond.id) {
            Some(existing) => *existing = bond,
            None => self.bonds.push(bond),
        }
    }

    /// Remove a bond. Returns the removed bond, if it was present.
    pub fn remove_bond(&mut self, id: BondId) -> Option<Bond> {
        let idx = self.bonds.iter().position(|b| b.id == id)?;
        Some(self.bonds.remove(idx))
    }
}
