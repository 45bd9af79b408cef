//! API Module
//!
//! HTTP handlers and routing for the content service.
//!
//! # Endpoints
//! - `GET /content` - Public feeds (homepage, category, single item)
//! - `GET /admin/content` - Admin listing, drafts included
//! - `POST /api/posts`, `PUT|DELETE /api/posts/:id` - Post writes
//! - `POST /api/categories`, `PUT|DELETE /api/categories/:id` - Category writes
//! - `POST /api/cache/clear` - Bump the epoch and drop local caches
//! - `GET /maintenance-status` - Current maintenance state
//! - `GET /maintenance` - Maintenance notice
//! - `GET|POST /admin/settings` - Site settings
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
