//! Feed Cache Sweep
//!
//! Background task that periodically removes expired and stale entries
//! from the feed cache. Lookups already refuse such entries; the sweep
//! only returns their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::FeedCache;
use crate::freshness::InvalidationCoordinator;

/// Spawns a background task that sweeps the feed cache every
/// `cleanup_interval_secs` seconds.
///
/// Returns the task's JoinHandle so it can be aborted during graceful
/// shutdown.
///
/// # Example
/// ```ignore
/// let cleanup_handle = spawn_cleanup_task(state.feed_cache.clone(), state.coordinator.clone(), 5);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    feed_cache: Arc<FeedCache>,
    coordinator: Arc<InvalidationCoordinator>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting feed cache sweep with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = feed_cache.cleanup(coordinator.current_epoch()).await;
            if removed > 0 {
                info!("Feed cache sweep: removed {} entries", removed);
            } else {
                debug!("Feed cache sweep: nothing to remove");
            }
        }
    })
}
