//! Synchronizer configuration, loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::models::{QueryFilter, QueryScope};

/// Client configuration parameters.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the content service, without a trailing slash
    pub base_url: String,
    pub scope: QueryScope,
    pub filter: QueryFilter,
    pub poll_interval: Duration,
    pub force_refresh_timeout: Duration,
}

impl SyncConfig {
    /// Creates a new SyncConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FRESHWATCH_URL` - Content service URL (default: http://127.0.0.1:3000)
    /// - `FRESHWATCH_SCOPE` - Feed to watch (default: homepage)
    /// - `FRESHWATCH_CATEGORY` - Category for category feeds (default: unset)
    /// - `FRESHWATCH_SLUG` - Post slug for single-item views (default: unset)
    /// - `POLL_INTERVAL` - Poll period in seconds (default: 30)
    /// - `FORCE_REFRESH_TIMEOUT` - Force refresh bound in seconds (default: 10)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            base_url: lookup("FRESHWATCH_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty())
                .unwrap_or(defaults.base_url),
            scope: lookup("FRESHWATCH_SCOPE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.scope),
            filter: QueryFilter {
                category: lookup("FRESHWATCH_CATEGORY").filter(|c| !c.is_empty()),
                slug: lookup("FRESHWATCH_SLUG").filter(|s| !s.is_empty()),
            },
            poll_interval: secs("POLL_INTERVAL", defaults.poll_interval),
            force_refresh_timeout: secs("FORCE_REFRESH_TIMEOUT", defaults.force_refresh_timeout),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            scope: QueryScope::Homepage,
            filter: QueryFilter::default(),
            poll_interval: Duration::from_secs(30),
            force_refresh_timeout: Duration::from_secs(10),
        }
    }
}
