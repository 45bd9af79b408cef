//! Request DTOs for the content service
//!
//! Defines the structure of incoming query strings and bodies.

use serde::Deserialize;

use crate::models::{QueryFilter, QueryScope, UnknownScope, DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT};

/// Query string of `GET /content` and `GET /admin/content`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentParams {
    pub scope: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Cache-busting token sent by a forced refresh
    #[serde(default)]
    pub bust: Option<String>,
}

impl ContentParams {
    /// The requested scope; missing and unknown scopes are both errors.
    pub fn scope(&self) -> Result<QueryScope, UnknownScope> {
        match &self.scope {
            Some(raw) => raw.parse(),
            None => Err(UnknownScope(String::new())),
        }
    }

    pub fn filter(&self) -> QueryFilter {
        QueryFilter {
            category: self.category.clone().filter(|c| !c.is_empty()),
            slug: self.slug.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Requested page size, clamped to `1..=MAX_FEED_LIMIT`.
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT)
    }

    pub fn wants_bypass(&self) -> bool {
        self.bust.as_deref().is_some_and(|b| !b.is_empty())
    }
}
