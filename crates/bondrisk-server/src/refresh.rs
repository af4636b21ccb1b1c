//! Background curve refresh.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use bondrisk_engine::RiskService;
use bondrisk_traits::CurveSource;

/// Poll `source` once per `curve_refresh_secs` of the service's cache policy
/// and install the result as the live curve.
///
/// The first poll happens one interval after the call. A failed poll keeps
/// the current curve and is retried on the next tick.
pub fn spawn_curve_refresh(service: Arc<RiskService>, source: Arc<dyn CurveSource>) -> JoinHandle<()> {
    // Non-zero: RiskServiceBuilder validates the policy.
    let every = service.cache().policy().curve_refresh_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            source = source.source_name(),
            every_secs = every.as_secs(),
            "curve refresh started"
        );
        loop {
            ticker.tick().await;
            if let Err(e) = service.refresh_from(source.as_ref()).await {
                warn!(error = %e, "curve refresh failed, keeping current curve");
            }
        }
    })
}
