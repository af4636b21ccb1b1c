//! Market data sources.

use async_trait::async_trait;

use bondrisk_core::YieldCurve;

use crate::error::TraitError;

/// Supplier of the live discount curve.
///
/// Polled by the refresh loop; the engine never calls it mid-computation.
#[async_trait]
pub trait CurveSource: Send + Sync {
    /// Source name for logs.
    fn source_name(&self) -> &'static str;

    /// Fetch the latest curve.
    async fn latest_curve(&self) -> Result<YieldCurve, TraitError>;
}
