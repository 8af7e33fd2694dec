//! Background status poll.
//!
//! Queries GET /api/status once a second and folds the counters into shared
//! state. Best-effort by contract: failures are swallowed (trace-level only)
//! so a flaky control surface never produces user-visible noise.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::acquisition::AcquisitionClient;
use crate::pipeline::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run_status_poll(
    state: Arc<RwLock<AppState>>,
    client: AcquisitionClient,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!("status poll shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        match client.status().await {
            Ok(status) => {
                let mut state = state.write().await;
                // The poll is a secondary source; never regress the counter
                // the stream already advanced.
                state.link.total_samples = state.link.total_samples.max(status.total_samples);
            }
            Err(e) => {
                tracing::trace!("status poll failed: {e}");
            }
        }
    }
}
