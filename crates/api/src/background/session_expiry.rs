//! Periodic purge of idle sessions.
//!
//! Sessions untouched for longer than the configured TTL are dropped from
//! the store together with their provenance and job tables.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use subjob_core::session::SessionStore;
use tokio_util::sync::CancellationToken;

/// How often the purge runs.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the session expiry loop until `cancel` is triggered.
pub async fn run(
    store: Arc<dyn SessionStore>,
    idle_ttl: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        idle_ttl_secs = idle_ttl.as_secs(),
        interval_secs = interval.as_secs(),
        "Session expiry job started"
    );

    let ttl = chrono::Duration::from_std(idle_ttl).unwrap_or(chrono::Duration::MAX);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session expiry job stopping");
                break;
            }
            _ = ticker.tick() => {
                let cutoff = Utc::now()
                    .checked_sub_signed(ttl)
                    .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
                let purged = store.purge_idle(cutoff).await;
                if purged > 0 {
                    tracing::info!(purged, "Session expiry: purged idle sessions");
                } else {
                    tracing::debug!("Session expiry: nothing to purge");
                }
            }
        }
    }
}
