//! Invalidation Coordinator
//!
//! Owns the process-wide cache epoch: a single "something changed" signal
//! that knows nothing about what changed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::content::ContentStore;

// == Local Cache ==
/// A process-local read-through cache the coordinator can drop.
#[async_trait]
pub trait LocalCache: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drops every entry, returning how many were held.
    async fn clear(&self) -> usize;
}

/// Result of an explicit cache clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Epoch after the clear
    pub epoch: u64,
    /// Entries dropped across all local caches
    pub dropped: usize,
    pub caches: usize,
}

// == Invalidation Coordinator ==
pub struct InvalidationCoordinator {
    epoch: AtomicU64,
    store: Arc<dyn ContentStore>,
    caches: Vec<Arc<dyn LocalCache>>,
}

impl InvalidationCoordinator {
    // == Constructors ==
    /// Creates a coordinator starting at `initial_epoch`.
    pub fn new(store: Arc<dyn ContentStore>, initial_epoch: u64) -> Self {
        Self {
            epoch: AtomicU64::new(initial_epoch),
            store,
            caches: Vec::new(),
        }
    }

    /// Creates a coordinator whose epoch continues from the persisted one.
    ///
    /// The starting value is the larger of the persisted epoch and the boot
    /// time in milliseconds, so a restart never moves the epoch backwards.
    /// An unreadable store only costs a spurious "everything changed".
    pub async fn boot(store: Arc<dyn ContentStore>) -> Self {
        let persisted = match store.read_settings().await {
            Ok(settings) => settings.epoch,
            Err(e) => {
                warn!("Could not read persisted epoch, starting from boot time: {}", e);
                0
            }
        };
        let initial = persisted.max(current_timestamp_ms());

        if let Err(e) = store.persist_epoch(initial).await {
            warn!("Could not persist boot epoch {}: {}", initial, e);
        }
        info!(epoch = initial, persisted, "Invalidation coordinator booted");

        Self::new(store, initial)
    }

    /// Registers a local cache to be dropped by [`clear_all`](Self::clear_all).
    pub fn with_cache(mut self, cache: Arc<dyn LocalCache>) -> Self {
        self.caches.push(cache);
        self
    }

    // == Current Epoch ==
    /// Lock-free read of the current epoch.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    // == Bump ==
    /// Atomically advances the epoch and returns the new value.
    ///
    /// Concurrent callers each get a distinct value; none is lost.
    pub async fn bump(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        // The store keeps the maximum, so racing persists cannot regress it
        if let Err(e) = self.store.persist_epoch(epoch).await {
            warn!(epoch, "Epoch bumped in memory but not persisted: {}", e);
        }

        debug!(epoch, "Cache epoch bumped");
        epoch
    }

    // == Clear All ==
    /// Bumps the epoch and drops every registered local cache.
    ///
    /// Clearing caches that hold nothing is still a success.
    pub async fn clear_all(&self) -> ClearReport {
        let epoch = self.bump().await;

        let mut dropped = 0;
        for cache in &self.caches {
            let count = cache.clear().await;
            debug!(cache = cache.name(), dropped = count, "Local cache cleared");
            dropped += count;
        }

        info!(epoch, dropped, caches = self.caches.len(), "All caches cleared");
        ClearReport {
            epoch,
            dropped,
            caches: self.caches.len(),
        }
    }
}

impl fmt::Debug for InvalidationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationCoordinator")
            .field("epoch", &self.current_epoch())
            .field("caches", &self.caches.len())
            .finish()
    }
}
