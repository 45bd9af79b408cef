//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::freshness::{SingleItemPolicy, CATEGORY_FEED_TTL};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Lifetime in seconds of a public category feed
    pub category_feed_ttl: u64,
    /// Caching directive for public single-post reads
    pub single_item_policy: SingleItemPolicy,
    /// Lifetime in seconds of a single-post read under `ShortTtl`
    pub single_item_ttl: u64,
    /// Capacity of the process-local query cache
    pub query_cache_entries: usize,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Where the settings document is persisted; memory only when unset
    pub settings_path: Option<PathBuf>,
    /// Retry-After sent with the maintenance view, in seconds
    pub maintenance_retry_after: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CATEGORY_FEED_TTL` - Category feed lifetime in seconds (default: 300)
    /// - `SINGLE_ITEM_POLICY` - `short_ttl`, `live` or `no_store` (default: short_ttl)
    /// - `SINGLE_ITEM_TTL` - Single post lifetime in seconds (default: 300)
    /// - `QUERY_CACHE_ENTRIES` - Query cache capacity (default: 512)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 5)
    /// - `SETTINGS_PATH` - Settings document file (default: unset)
    /// - `MAINTENANCE_RETRY_AFTER` - Retry-After in seconds (default: 120)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port),
            category_feed_ttl: parse_or(&lookup, "CATEGORY_FEED_TTL", defaults.category_feed_ttl),
            single_item_policy: parse_or(
                &lookup,
                "SINGLE_ITEM_POLICY",
                defaults.single_item_policy,
            ),
            single_item_ttl: parse_or(&lookup, "SINGLE_ITEM_TTL", defaults.single_item_ttl),
            query_cache_entries: parse_or(
                &lookup,
                "QUERY_CACHE_ENTRIES",
                defaults.query_cache_entries,
            ),
            cleanup_interval: parse_or(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval)
                .max(1),
            settings_path: lookup("SETTINGS_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            maintenance_retry_after: parse_or(
                &lookup,
                "MAINTENANCE_RETRY_AFTER",
                defaults.maintenance_retry_after,
            ),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            category_feed_ttl: CATEGORY_FEED_TTL,
            single_item_policy: SingleItemPolicy::ShortTtl,
            single_item_ttl: 300,
            query_cache_entries: 512,
            cleanup_interval: 5,
            settings_path: None,
            maintenance_retry_after: 120,
        }
    }
}
