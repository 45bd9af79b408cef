//! Cache Entry Module
//!
//! A cached query result together with the epoch it was computed under and
//! its expiry.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Cache epoch observed before the query ran
    pub epoch: u64,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped with `epoch` that lives for `ttl_seconds`.
    pub fn new(value: V, epoch: u64, ttl_seconds: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            epoch,
            created_at: now,
            expires_at: ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000))),
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|expires| now_ms >= expires)
    }

    // == Is Stale ==
    /// An entry computed under an older epoch than `current_epoch` must not
    /// be served. Equal epochs are fresh; a newer write always bumps.
    pub fn is_stale(&self, current_epoch: u64) -> bool {
        current_epoch > self.epoch
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
