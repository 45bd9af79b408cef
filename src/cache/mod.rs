//! Cache Module
//!
//! Process-local read-through cache for storable content queries. Entries
//! carry the epoch they were computed under and are refused once the
//! invalidation coordinator has moved past it.

mod entry;
mod lru;
mod stats;
mod store;


use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::freshness::LocalCache;
use crate::models::{Post, QueryFilter, QueryScope};

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheMiss, CachedValue, QueryCache};

// == Feed Cache ==
/// Shared query cache for content feeds.
#[derive(Debug)]
pub struct FeedCache {
    inner: RwLock<QueryCache<Vec<Post>>>,
}

impl FeedCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(QueryCache::new(max_entries)),
        }
    }

    /// Cache key for one query shape.
    pub fn key(scope: QueryScope, filter: &QueryFilter, limit: usize) -> String {
        format!(
            "{}|c={}|s={}|n={}",
            scope,
            filter.category.as_deref().unwrap_or(""),
            filter.slug.as_deref().unwrap_or(""),
            limit
        )
    }

    /// Looks up a result valid under `current_epoch`.
    pub async fn get(&self, key: &str, current_epoch: u64) -> Option<CachedValue<Vec<Post>>> {
        // Write lock: a lookup updates LRU order and stats
        self.inner.write().await.get(key, current_epoch).ok()
    }

    pub async fn insert(&self, key: String, posts: Vec<Post>, epoch: u64, ttl: Option<u64>) {
        self.inner.write().await.insert(key, posts, epoch, ttl);
    }

    pub async fn cleanup(&self, current_epoch: u64) -> usize {
        self.inner.write().await.cleanup(current_epoch)
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl LocalCache for FeedCache {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn clear(&self) -> usize {
        self.inner.write().await.clear()
    }
}
