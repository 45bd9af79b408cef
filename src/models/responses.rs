//! Response DTOs for the content service
//!
//! Defines the structure of outgoing HTTP response bodies. They also
//! deserialize, since the freshness synchronizer reads them back.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::freshness::CachePolicy;
use crate::models::{Category, MaintenanceState, Post, QueryScope, SiteSettings};

/// Response body for content feeds (`GET /content`, `GET /admin/content`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub scope: QueryScope,
    /// Epoch the items were computed under
    pub epoch: u64,
    pub policy: CachePolicy,
    pub count: usize,
    pub items: Vec<Post>,
}

impl ContentResponse {
    pub fn new(scope: QueryScope, epoch: u64, policy: CachePolicy, items: Vec<Post>) -> Self {
        Self {
            scope,
            epoch,
            policy,
            count: items.len(),
            items,
        }
    }
}

/// Response body for `POST /api/cache/clear`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub success: bool,
    pub message: String,
    /// Epoch after the clear
    pub epoch: u64,
    /// Local cache entries dropped
    pub dropped: usize,
}

impl ClearCacheResponse {
    pub fn new(epoch: u64, dropped: usize) -> Self {
        Self {
            success: true,
            message: "Cache cleared successfully".to_string(),
            epoch,
            dropped,
        }
    }
}

/// The maintenance notice, served by the gate and by `GET /maintenance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceView {
    pub maintenance: bool,
    pub message: String,
    /// Seconds a client should wait before retrying
    pub retry_after: u64,
}

impl MaintenanceView {
    pub fn new(state: &MaintenanceState, retry_after: u64) -> Self {
        Self {
            maintenance: state.enabled,
            message: state.message.clone(),
            retry_after,
        }
    }
}

/// Response body for content mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    /// Epoch after the write
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

/// Response body for `GET/POST /admin/settings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub settings: SiteSettings,
    pub epoch: u64,
}

/// Response body for the health endpoint (`GET /health`)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub epoch: u64,
    pub feed_cache: CacheStats,
}

impl HealthResponse {
    pub fn healthy(epoch: u64, feed_cache: CacheStats) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            epoch,
            feed_cache,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub retryable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_response_counts_items() {
        let resp = ContentResponse::new(
            QueryScope::Homepage,
            7,
            CachePolicy::private_no_store(),
            Vec::new(),
        );
        assert_eq!(resp.count, 0);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["scope"], "homepage");
        assert_eq!(json["policy"]["directive"], "PRIVATE_NO_STORE");
        assert!(json["policy"].get("ttl_seconds").is_none());
    }

    #[test]
    fn test_short_ttl_policy_serializes_ttl() {
        let json = serde_json::to_value(CachePolicy::short_ttl(300)).unwrap();
        assert_eq!(json["directive"], "SHORT_TTL");
        assert_eq!(json["ttl_seconds"], 300);
    }

    #[test]
    fn test_maintenance_view_carries_message() {
        let state = MaintenanceState {
            enabled: true,
            message: "Upgrading".to_string(),
        };
        let view = MaintenanceView::new(&state, 120);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("Upgrading"));
        assert!(json.contains("\"retry_after\":120"));
    }

    #[test]
    fn test_mutation_response_omits_empty_fields() {
        let resp = MutationResponse {
            epoch: 3,
            post: None,
            category: None,
            deleted: Some(9),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["deleted"], 9);
        assert!(json.get("post").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(1, CacheStats::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("feed_cache"));
    }
}
