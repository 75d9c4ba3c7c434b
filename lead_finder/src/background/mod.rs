mod job_runner;

pub use job_runner::*;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Daily TTL sweep over the discovery caches.
pub async fn run_cache_sweeper(state: Arc<AppState>, shutdown: CancellationToken) {
    info!("Starting cache sweeper loop");

    loop {
        tokio::select! {
            _ = sleep(SWEEP_INTERVAL) => {}
            _ = shutdown.cancelled() => {
                info!("Cache sweeper received shutdown signal");
                break;
            }
        }

        match state.services.cache.sweep().await {
            Ok(removed) => debug!("Cache sweep removed {} stale entries", removed),
            Err(e) => error!("Cache sweep failed: {:?}", e),
        }
    }
}
