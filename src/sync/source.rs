//! Feed sources the synchronizer pulls from.

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use super::{SyncConfig, SyncError};
use crate::models::{
    ClearCacheResponse, ContentResponse, ErrorResponse, MaintenanceView, QueryFilter, QueryScope,
};

/// What a fetch came back with.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Feed(ContentResponse),
    /// The site is in maintenance; the feed was not served
    Maintenance(MaintenanceView),
}

// == Feed Source ==
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the watched feed. With `bust` set, every cache tier is
    /// skipped and the value is sent as the uniqueness token.
    async fn fetch(&self, bust: Option<u64>) -> Result<FetchOutcome, SyncError>;

    /// Asks the server to clear all caches; returns the acknowledged epoch.
    async fn clear_all(&self) -> Result<u64, SyncError>;
}

// == HTTP Feed Source ==
/// Feed source talking to a running content service.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    scope: QueryScope,
    filter: QueryFilter,
}

impl HttpFeedSource {
    pub fn new(base_url: impl Into<String>, scope: QueryScope, filter: QueryFilter) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            scope,
            filter,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.base_url.clone(), config.scope, config.filter.clone())
    }
}

async fn status_error(response: Response) -> SyncError {
    let status = response.status().as_u16();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => "unexpected response".to_string(),
    };
    SyncError::Status { status, message }
}

fn transport(err: reqwest::Error) -> SyncError {
    SyncError::Transport(err.to_string())
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, bust: Option<u64>) -> Result<FetchOutcome, SyncError> {
        let mut request = self
            .client
            .get(format!("{}/content", self.base_url))
            .query(&[("scope", self.scope.as_str())]);
        if let Some(category) = &self.filter.category {
            request = request.query(&[("category", category.as_str())]);
        }
        if let Some(slug) = &self.filter.slug {
            request = request.query(&[("slug", slug.as_str())]);
        }
        if let Some(token) = bust {
            request = request
                .query(&[("bust", token.to_string())])
                .header(CACHE_CONTROL, "no-cache, no-store")
                .header(PRAGMA, "no-cache");
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(status = status.as_u16(), bust = ?bust, "Feed fetched");

        if status.is_success() {
            let body = response
                .json::<ContentResponse>()
                .await
                .map_err(|e| SyncError::Decode(e.to_string()))?;
            return Ok(FetchOutcome::Feed(body));
        }

        // A store outage is also a 503, but only the maintenance view sets Retry-After
        if status == StatusCode::SERVICE_UNAVAILABLE && response.headers().contains_key(RETRY_AFTER)
        {
            let view = response
                .json::<MaintenanceView>()
                .await
                .map_err(|e| SyncError::Decode(e.to_string()))?;
            return Ok(FetchOutcome::Maintenance(view));
        }

        Err(status_error(response).await)
    }

    async fn clear_all(&self) -> Result<u64, SyncError> {
        let response = self
            .client
            .post(format!("{}/api/cache/clear", self.base_url))
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let ack = response
            .json::<ClearCacheResponse>()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))?;
        Ok(ack.epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let source = HttpFeedSource::new(
            "http://localhost:3000/",
            QueryScope::Homepage,
            QueryFilter::default(),
        );
        assert_eq!(source.base_url, "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) is closed on test machines
        let source = HttpFeedSource::new(
            "http://127.0.0.1:9",
            QueryScope::Homepage,
            QueryFilter::default(),
        );

        let err = source.fetch(None).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(err.is_retryable());
    }
}
