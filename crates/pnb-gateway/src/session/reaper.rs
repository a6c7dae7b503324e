//! Expired session reaper
//!
//! Sessions are evicted lazily when a client presents an expired token, but a
//! client that simply goes away never does. This background task sweeps the
//! store periodically so abandoned sessions stop counting against their
//! address's cap and stop holding memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::manager::SessionManager;

/// Interval between reaper sweeps
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(300);

/// Run the reaper until `cancel` fires.
///
/// The first sweep happens one full `interval` after start.
pub async fn run_session_reaper(
    manager: Arc<SessionManager>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!("Starting session reaper (interval: {:?})", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep(&manager);
            }
            _ = cancel.cancelled() => {
                tracing::info!("Session reaper shutting down");
                break;
            }
        }
    }
}

/// Spawn [`run_session_reaper`] on the current runtime
pub fn spawn_session_reaper(
    manager: Arc<SessionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_session_reaper(manager, interval, cancel))
}

fn sweep(manager: &SessionManager) {
    let report = manager.reap_expired();

    if report.failures > 0 {
        tracing::warn!(
            "Reaper removed {} of {} expired sessions ({} failed)",
            report.removed,
            report.expired,
            report.failures
        );
    } else if report.removed > 0 {
        tracing::info!("Reaped {} expired sessions", report.removed);
    } else {
        tracing::trace!("Reaper sweep found nothing to remove");
    }
}
