//! API Handlers
//!
//! HTTP request handlers for content reads, content mutations, cache
//! clearing, the maintenance surface and site settings.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CACHE_CONTROL, IF_NONE_MATCH, PRAGMA, RETRY_AFTER},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info, warn};

use crate::cache::FeedCache;
use crate::config::Config;
use crate::content::{ContentStore, MemoryStore, MutationOp, MutationOutcome, StoreError};
use crate::error::{AppError, Result};
use crate::freshness::{
    CachePolicy, InvalidationCoordinator, MaintenanceGate, PolicyResolver, QueryDescriptor,
    UniquenessToken,
};
use crate::models::{
    CategoryDraft, CategoryPatch, ClearCacheResponse, ContentParams, ContentResponse,
    HealthResponse, MaintenanceState, MaintenanceView, MutationResponse, Post, PostDraft, PostPatch,
    QueryFilter, QueryScope, SettingsPatch, SettingsResponse,
};

/// Application state shared across all handlers.
///
/// Owned by `main` and injected into the router; nothing here is global.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub coordinator: Arc<InvalidationCoordinator>,
    pub gate: Arc<MaintenanceGate>,
    pub resolver: PolicyResolver,
    pub feed_cache: Arc<FeedCache>,
    /// Retry-After sent with the maintenance view, in seconds
    pub retry_after: u64,
}

impl AppState {
    /// Creates a state whose epoch starts at 1.
    pub fn new(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        let coordinator = InvalidationCoordinator::new(store.clone(), 1);
        Self::assemble(store, coordinator, config)
    }

    /// Creates a state whose epoch continues from the one the store persisted.
    pub async fn boot(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        let coordinator = InvalidationCoordinator::boot(store.clone()).await;
        Self::assemble(store, coordinator, config)
    }

    /// Opens the configured content store and boots the state on top of it.
    pub async fn from_config(config: &Config) -> std::result::Result<Self, StoreError> {
        let store = match &config.settings_path {
            Some(path) => MemoryStore::open(path).await?,
            None => MemoryStore::new(),
        };
        Ok(Self::boot(Arc::new(store), config).await)
    }

    fn assemble(
        store: Arc<dyn ContentStore>,
        coordinator: InvalidationCoordinator,
        config: &Config,
    ) -> Self {
        let feed_cache = Arc::new(FeedCache::new(config.query_cache_entries));
        let coordinator = Arc::new(coordinator.with_cache(feed_cache.clone()));
        let gate = Arc::new(MaintenanceGate::new(store.clone(), coordinator.clone()));

        Self {
            store,
            coordinator,
            gate,
            resolver: PolicyResolver::from_config(config),
            feed_cache,
            retry_after: config.maintenance_retry_after,
        }
    }

    /// Applies a content write, then bumps the epoch.
    ///
    /// A failed write is returned to the caller untouched and never retried;
    /// the epoch only moves once the store has committed.
    pub async fn mutate(&self, op: MutationOp) -> Result<(MutationOutcome, u64)> {
        let label = op.label();
        let outcome = self.store.mutate_content(op).await.map_err(|e| {
            warn!(op = label, "Content write rejected: {}", e);
            AppError::from(e)
        })?;

        let epoch = self.coordinator.bump().await;
        info!(op = label, epoch, "Content write committed");
        Ok((outcome, epoch))
    }

    // == Query Execution ==
    /// Runs a content query, going through the feed cache when the policy
    /// allows it. Returns the items and the epoch they were computed under.
    async fn load(
        &self,
        scope: QueryScope,
        filter: &QueryFilter,
        limit: usize,
        policy: &CachePolicy,
    ) -> Result<(Vec<Post>, u64)> {
        // Read before the query so a racing write can only make the tag older
        let epoch = self.coordinator.current_epoch();

        if !policy.is_storable() {
            let items = self.store.query_content(scope, filter, limit).await?;
            return Ok((items, epoch));
        }

        let key = FeedCache::key(scope, filter, limit);
        if let Some(hit) = self.feed_cache.get(&key, epoch).await {
            debug!(key = %key, epoch = hit.epoch, "Feed cache hit");
            return Ok((hit.value, hit.epoch));
        }

        let items = self.store.query_content(scope, filter, limit).await?;
        self.feed_cache
            .insert(key, items.clone(), epoch, policy.ttl_seconds)
            .await;
        Ok((items, epoch))
    }

    /// Resolves the policy, loads the items and renders the annotated response.
    async fn serve_query(
        &self,
        descriptor: QueryDescriptor,
        params: &ContentParams,
        headers: &HeaderMap,
    ) -> Result<Response> {
        let scope = descriptor
            .scope
            .ok_or_else(|| AppError::InvalidRequest("scope is required".to_string()))?;
        let policy = self.resolver.resolve(&descriptor);
        let (items, epoch) = self
            .load(scope, &params.filter(), params.limit(), &policy)
            .await?;
        let token = UniquenessToken::derive(scope.as_str(), epoch, items.len());

        let revalidated = policy.allows_revalidation()
            && headers
                .get(IF_NONE_MATCH)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|candidates| token.matches(candidates));

        let mut response = if revalidated {
            StatusCode::NOT_MODIFIED.into_response()
        } else {
            Json(ContentResponse::new(scope, epoch, policy, items)).into_response()
        };
        policy.apply(response.headers_mut(), Some(&token));
        Ok(response)
    }
}

// == Helpers ==
/// True when request headers ask every cache tier to be skipped.
pub fn request_wants_bypass(headers: &HeaderMap) -> bool {
    let says_no_cache = |value: &HeaderValue| {
        value.to_str().is_ok_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("no-cache") || v.contains("no-store")
        })
    };

    headers.get(CACHE_CONTROL).is_some_and(says_no_cache)
        || headers.get(PRAGMA).is_some_and(says_no_cache)
}

/// Marks any response PRIVATE_NO_STORE.
fn no_store(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    CachePolicy::private_no_store().apply(response.headers_mut(), None);
    response
}

/// The maintenance notice: 503 with Retry-After and the current message.
pub fn render_maintenance(state: &MaintenanceState, retry_after: u64) -> Response {
    let mut response = no_store((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(MaintenanceView::new(state, retry_after)),
    ));
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

fn mutation_response(outcome: MutationOutcome, epoch: u64) -> MutationResponse {
    let mut response = MutationResponse {
        epoch,
        post: None,
        category: None,
        deleted: None,
    };
    match outcome {
        MutationOutcome::Post(post) => response.post = Some(post),
        MutationOutcome::Category(category) => response.category = Some(category),
        MutationOutcome::Deleted { id } => response.deleted = Some(id),
    }
    response
}

fn parse_scope(params: &ContentParams) -> Result<QueryScope> {
    params.scope().map_err(|unknown| {
        if unknown.0.is_empty() {
            AppError::InvalidRequest("scope is required".to_string())
        } else {
            AppError::InvalidRequest(format!("unknown scope '{}'", unknown.0))
        }
    })
}

// == Content Reads ==
/// Handler for GET /content
///
/// Public feeds. Drafts are never listed here, so the admin scope is refused.
pub async fn content_handler(
    State(state): State<AppState>,
    Query(params): Query<ContentParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let scope = parse_scope(&params)?;
    if scope == QueryScope::Admin {
        return Err(AppError::Forbidden(
            "the admin listing is served on /admin/content".to_string(),
        ));
    }

    let bypass = params.wants_bypass() || request_wants_bypass(&headers);
    let descriptor = QueryDescriptor::public(scope).with_bypass(bypass);
    state.serve_query(descriptor, &params, &headers).await
}

/// Handler for GET /admin/content
///
/// Admin reads default to the full listing and are always PRIVATE_NO_STORE.
pub async fn admin_content_handler(
    State(state): State<AppState>,
    Query(params): Query<ContentParams>,
    headers: HeaderMap,
) -> Result<Response> {
    let scope = match params.scope {
        None => QueryScope::Admin,
        Some(_) => parse_scope(&params)?,
    };
    state
        .serve_query(QueryDescriptor::admin(scope), &params, &headers)
        .await
}

// == Content Mutations ==
/// Handler for POST /api/posts
pub async fn create_post_handler(
    State(state): State<AppState>,
    Json(draft): Json<PostDraft>,
) -> Result<Response> {
    let (outcome, epoch) = state.mutate(MutationOp::CreatePost(draft)).await?;
    Ok(no_store((
        StatusCode::CREATED,
        Json(mutation_response(outcome, epoch)),
    )))
}

/// Handler for PUT /api/posts/:id
pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<PostPatch>,
) -> Result<Response> {
    let (outcome, epoch) = state.mutate(MutationOp::UpdatePost { id, patch }).await?;
    Ok(no_store(Json(mutation_response(outcome, epoch))))
}

/// Handler for DELETE /api/posts/:id
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let (outcome, epoch) = state.mutate(MutationOp::DeletePost { id }).await?;
    Ok(no_store(Json(mutation_response(outcome, epoch))))
}

/// Handler for POST /api/categories
pub async fn create_category_handler(
    State(state): State<AppState>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Response> {
    let (outcome, epoch) = state.mutate(MutationOp::CreateCategory(draft)).await?;
    Ok(no_store((
        StatusCode::CREATED,
        Json(mutation_response(outcome, epoch)),
    )))
}

/// Handler for PUT /api/categories/:id
pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<CategoryPatch>,
) -> Result<Response> {
    let (outcome, epoch) = state
        .mutate(MutationOp::UpdateCategory { id, patch })
        .await?;
    Ok(no_store(Json(mutation_response(outcome, epoch))))
}

/// Handler for DELETE /api/categories/:id
pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let (outcome, epoch) = state.mutate(MutationOp::DeleteCategory { id }).await?;
    Ok(no_store(Json(mutation_response(outcome, epoch))))
}

// == Cache Clearing ==
/// Handler for POST /api/cache/clear
///
/// Always succeeds; clearing caches that hold nothing is not an error.
pub async fn clear_cache_handler(State(state): State<AppState>) -> Response {
    let report = state.coordinator.clear_all().await;
    no_store(Json(ClearCacheResponse::new(report.epoch, report.dropped)))
}

// == Maintenance Surface ==
/// Handler for GET /maintenance-status
pub async fn maintenance_status_handler(State(state): State<AppState>) -> Response {
    let current = state.gate.current().await;
    no_store(Json(MaintenanceView::new(&current, state.retry_after)))
}

/// Handler for GET /maintenance
///
/// Shows the notice while maintenance is on, and a plain 200 otherwise so a
/// bookmarked notice page does not keep reporting an outage.
pub async fn maintenance_page_handler(State(state): State<AppState>) -> Response {
    let current = state.gate.current().await;
    if current.enabled {
        render_maintenance(&current, state.retry_after)
    } else {
        no_store(Json(MaintenanceView::new(&current, state.retry_after)))
    }
}

// == Settings ==
/// Handler for GET /admin/settings
pub async fn get_settings_handler(State(state): State<AppState>) -> Result<Response> {
    let settings = state.store.read_settings().await?;
    Ok(no_store(Json(SettingsResponse {
        settings,
        epoch: state.coordinator.current_epoch(),
    })))
}

/// Handler for POST /admin/settings
///
/// Every successful write bumps the epoch, whether or not maintenance changed.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Response> {
    let settings = state.gate.write_settings(patch).await.map_err(|e| {
        warn!("Settings write rejected: {}", e);
        AppError::from(e)
    })?;

    Ok(no_store(Json(SettingsResponse {
        settings,
        epoch: state.coordinator.current_epoch(),
    })))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.coordinator.current_epoch(),
        state.feed_cache.stats().await,
    ))
}
