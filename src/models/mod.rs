//! Models for the content service
//!
//! Content records, the query vocabulary shared with the freshness layer,
//! and the DTOs used for HTTP request and response bodies.

pub mod content;
pub mod query;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use content::{
    Category, CategoryDraft, CategoryPatch, MaintenanceState, Post, PostDraft, PostPatch, SettingsPatch,
    SiteSettings, DEFAULT_MAINTENANCE_MESSAGE,
};
pub use query::{QueryFilter, QueryScope, UnknownScope, DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT};
pub use requests::ContentParams;
pub use responses::{
    ClearCacheResponse, ContentResponse, ErrorResponse, HealthResponse, MaintenanceView,
    MutationResponse, SettingsResponse,
};
