//! # Bondrisk Core
//!
//! Foundational types shared by every bondrisk crate:
//!
//! - **Identifiers**: [`UserId`], [`PortfolioId`], [`BondId`]
//! - **Reference data**: [`Bond`], [`NewBond`], [`Portfolio`]
//! - **Market data**: [`YieldCurve`], [`CurvePoint`]
//! - **Results**: [`RiskResult`], [`StressResult`], [`ShockDirection`]
//! - **Errors**: [`RiskError`] and its [`ErrorKind`] taxonomy
//!
//! Everything here is plain data. Pricing lives in `bondrisk-analytics`,
//! caching and orchestration in `bondrisk-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bond;
pub mod curve;
pub mod error;
pub mod ids;
pub mod results;

pub use bond::{Bond, NewBond, Portfolio};
pub use curve::{CurvePoint, YieldCurve};
pub use error::{CoreResult, ErrorKind, RiskError};
pub use ids::{BondId, PortfolioId, UserId};
pub use results::{CurrentRate, RiskResult, ShockDirection, StressResult};

/// One basis point as a decimal rate.
pub const ONE_BP: f64 = 0.0001;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bond::{Bond, NewBond, Portfolio};
    pub use crate::curve::{CurvePoint, YieldCurve};
    pub use crate::error::{ErrorKind, RiskError};
    pub use crate::ids::{BondId, PortfolioId, UserId};
    pub use crate::results::{RiskResult, ShockDirection, StressResult};
    pub use crate::ONE_BP;
}
