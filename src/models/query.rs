//! Query Vocabulary
//!
//! Logical query shapes shared by the content store, the cache policy
//! resolver and the freshness synchronizer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Query Scope ==
/// The logical category of a content query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    /// Posts flagged for the homepage
    Homepage,
    /// Published posts of one category
    Category,
    /// Every post including drafts, for editors
    Admin,
    /// One published post by slug
    Item,
}

impl QueryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryScope::Homepage => "homepage",
            QueryScope::Category => "category",
            QueryScope::Admin => "admin",
            QueryScope::Item => "item",
        }
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a scope string names no known query shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScope(pub String);

impl FromStr for QueryScope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "homepage" | "homepage_feed" | "home" => Ok(QueryScope::Homepage),
            "category" | "category_feed" => Ok(QueryScope::Category),
            "admin" | "admin_listing" => Ok(QueryScope::Admin),
            "item" | "single_item" | "post" => Ok(QueryScope::Item),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

// == Query Filter ==
/// Narrowing applied within a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Category slug or name
    #[serde(default)]
    pub category: Option<String>,
    /// Post slug for single-item queries
    #[serde(default)]
    pub slug: Option<String>,
}

/// Default number of posts in a feed when the caller names no limit.
pub const DEFAULT_FEED_LIMIT: usize = 8;

/// Upper bound on any feed page.
pub const MAX_FEED_LIMIT: usize = 100;
