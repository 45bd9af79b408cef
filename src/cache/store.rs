//! Query Cache Store Module
//!
//! HashMap storage with LRU tracking, TTL expiration and epoch validation.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Miss ==
/// Why a lookup did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMiss {
    Absent,
    Expired,
    /// Computed under an epoch older than the current one
    Stale,
}

/// A value served from cache and the epoch it was computed under.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<V> {
    pub value: V,
    pub epoch: u64,
}

// == Query Cache ==
/// Bounded read-through cache for storable query results.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
}

impl<V: Clone> QueryCache<V> {
    // == Constructor ==
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
        }
    }

    // == Insert ==
    /// Stores a result computed under `epoch`.
    ///
    /// An existing entry with a newer epoch is kept: a slow query that
    /// started before a write must not replace a result computed after it.
    pub fn insert(&mut self, key: String, value: V, epoch: u64, ttl_seconds: Option<u64>) {
        if let Some(existing) = self.entries.get(&key) {
            if existing.epoch > epoch {
                return;
            }
        } else if self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }

        self.entries
            .insert(key.clone(), CacheEntry::new(value, epoch, ttl_seconds));
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Returns the entry for `key` if it is neither expired nor stale
    /// relative to `current_epoch`. Unusable entries are dropped.
    pub fn get(&mut self, key: &str, current_epoch: u64) -> Result<CachedValue<V>, CacheMiss> {
        let miss = match self.entries.get(key) {
            None => CacheMiss::Absent,
            Some(entry) if entry.is_stale(current_epoch) => CacheMiss::Stale,
            Some(entry) if entry.is_expired() => CacheMiss::Expired,
            Some(entry) => {
                let hit = CachedValue {
                    value: entry.value.clone(),
                    epoch: entry.epoch,
                };
                self.stats.record_hit();
                self.lru.touch(key);
                return Ok(hit);
            }
        };

        match miss {
            CacheMiss::Absent => self.stats.record_miss(),
            CacheMiss::Expired => {
                self.remove(key);
                self.stats.record_miss();
            }
            CacheMiss::Stale => {
                self.remove(key);
                self.stats.record_stale();
            }
        }
        Err(miss)
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Clear ==
    /// Drops every entry and returns how many were held.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.record_cleared(count);
        self.stats.set_total_entries(0);
        count
    }

    // == Cleanup ==
    /// Removes expired entries and entries older than `current_epoch`.
    pub fn cleanup(&mut self, current_epoch: u64) -> usize {
        let dead: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired() || entry.is_stale(current_epoch))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &dead {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.set_total_entries(self.entries.len());
        dead.len()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
