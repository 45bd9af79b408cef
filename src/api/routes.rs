//! API Routes
//!
//! Configures the Axum router with all content service endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    admin_content_handler, clear_cache_handler, content_handler, create_category_handler,
    create_post_handler, delete_category_handler, delete_post_handler, get_settings_handler,
    health_handler, maintenance_page_handler, maintenance_status_handler, update_category_handler,
    update_post_handler, update_settings_handler, AppState,
};
use super::middleware::maintenance_gate;
use crate::freshness::{MAINTENANCE_PATH, MAINTENANCE_STATUS_PATH};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - Maintenance gate: runs before every handler, exempt routes pass
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/content", get(content_handler))
        .route("/admin/content", get(admin_content_handler))
        .route(
            "/admin/settings",
            get(get_settings_handler).post(update_settings_handler),
        )
        .route("/api/posts", post(create_post_handler))
        .route(
            "/api/posts/:id",
            put(update_post_handler).delete(delete_post_handler),
        )
        .route("/api/categories", post(create_category_handler))
        .route(
            "/api/categories/:id",
            put(update_category_handler).delete(delete_category_handler),
        )
        .route("/api/cache/clear", post(clear_cache_handler))
        .route(MAINTENANCE_STATUS_PATH, get(maintenance_status_handler))
        .route(MAINTENANCE_PATH, get(maintenance_page_handler))
        .route("/health", get(health_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            maintenance_gate,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
