//! Error types for the content service
//!
//! Provides unified error handling using thiserror. Store failures are
//! translated here so no raw store error reaches a response unstructured.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::content::StoreError;
use crate::freshness::CachePolicy;
use crate::models::ErrorResponse;

// == App Error Enum ==
/// Unified error type for the HTTP surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The content store is temporarily unreachable; the caller may retry
    #[error("Content store unavailable: {0}")]
    TransientStore(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unique field already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller may not use this query shape on this route
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::TransientStore(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Invalid(msg) => AppError::InvalidRequest(msg),
        }
    }
}

impl AppError {
    /// True when the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::TransientStore(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::TransientStore(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Content is temporarily unavailable, please try again".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = Json(ErrorResponse {
            error: message,
            retryable: self.is_retryable(),
        });

        // Error bodies must never be reused by an intermediary
        let mut response = (status, body).into_response();
        CachePolicy::private_no_store().apply(response.headers_mut(), None);
        response
    }
}

// == Result Type Alias ==
/// Convenience Result type for the content service.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CACHE_CONTROL;

    #[test]
    fn test_store_errors_map_to_app_errors() {
        assert_eq!(
            AppError::from(StoreError::Unavailable("down".to_string())),
            AppError::TransientStore("down".to_string())
        );
        assert_eq!(
            AppError::from(StoreError::Conflict("slug".to_string())),
            AppError::Conflict("slug".to_string())
        );
    }

    #[test]
    fn test_transient_error_is_503_and_not_cacheable() {
        let response = AppError::TransientStore("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let cache_control = response.headers()[CACHE_CONTROL].to_str().unwrap();
        assert!(cache_control.contains("no-store"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
