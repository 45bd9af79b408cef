//! Cache Policy Resolver
//!
//! One declarative table mapping a query's logical scope to the caching
//! directive attached to its response. Every route goes through
//! [`PolicyResolver::resolve`]; no handler writes Cache-Control itself.

use std::fmt;
use std::str::FromStr;

use axum::http::{
    header::{CACHE_CONTROL, ETAG, EXPIRES, PRAGMA},
    HeaderMap, HeaderName, HeaderValue,
};
use serde::{Deserialize, Serialize};

use crate::models::QueryScope;

// == Header Names ==
const SURROGATE_CONTROL: HeaderName = HeaderName::from_static("surrogate-control");
const X_ACCEL_EXPIRES: HeaderName = HeaderName::from_static("x-accel-expires");
const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Lifetime of a public category feed.
pub const CATEGORY_FEED_TTL: u64 = 300;

// == Cache Directive ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheDirective {
    /// Storable, but revalidated on every use
    Live,
    /// Shared caches may reuse the response for `ttl_seconds`
    ShortTtl,
    /// Nobody may keep the response
    PrivateNoStore,
}

// == Cache Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub directive: CacheDirective,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

impl CachePolicy {
    pub fn private_no_store() -> Self {
        Self {
            directive: CacheDirective::PrivateNoStore,
            ttl_seconds: None,
        }
    }

    pub fn short_ttl(ttl_seconds: u64) -> Self {
        Self {
            directive: CacheDirective::ShortTtl,
            ttl_seconds: Some(ttl_seconds),
        }
    }

    pub fn live() -> Self {
        Self {
            directive: CacheDirective::Live,
            ttl_seconds: None,
        }
    }

    /// True when a process-local cache may hold the result of this query.
    pub fn is_storable(&self) -> bool {
        self.directive != CacheDirective::PrivateNoStore
    }

    /// True when a matching `If-None-Match` may be answered with 304.
    pub fn allows_revalidation(&self) -> bool {
        self.is_storable()
    }

    /// The Cache-Control value for this policy.
    pub fn cache_control(&self) -> String {
        match self.directive {
            CacheDirective::PrivateNoStore => {
                "private, no-cache, no-store, must-revalidate, max-age=0, s-maxage=0".to_string()
            }
            CacheDirective::ShortTtl => {
                format!("public, max-age={}", self.ttl_seconds.unwrap_or(0))
            }
            CacheDirective::Live => "no-cache, must-revalidate".to_string(),
        }
    }

    /// Writes this policy's headers, plus the uniqueness token as ETag.
    pub fn apply(&self, headers: &mut HeaderMap, token: Option<&UniquenessToken>) {
        if let Ok(value) = HeaderValue::from_str(&self.cache_control()) {
            headers.insert(CACHE_CONTROL, value);
        }

        if self.directive == CacheDirective::PrivateNoStore {
            // Older proxies and CDNs ignore Cache-Control alone
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
            headers.insert(SURROGATE_CONTROL, HeaderValue::from_static("no-store"));
            headers.insert(X_ACCEL_EXPIRES, HeaderValue::from_static("0"));
            headers.insert(X_CACHE_STATUS, HeaderValue::from_static("BYPASS"));
        }

        if let Some(value) = token.and_then(|t| HeaderValue::from_str(t.as_str()).ok()) {
            headers.insert(ETAG, value);
        }
    }
}

// == Uniqueness Token ==
/// Entity tag derived from the scope, the epoch the data was computed under
/// and the result-set size.
///
/// Identical inputs give identical tokens, so two reads with no write in
/// between agree and a read after a write does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniquenessToken(String);

impl UniquenessToken {
    pub fn derive(label: &str, epoch: u64, result_len: usize) -> Self {
        Self(format!("\"{}-{:x}-{}\"", label, epoch, result_len))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks an `If-None-Match` header value against this token.
    pub fn matches(&self, if_none_match: &str) -> bool {
        if_none_match.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/") == self.0
        })
    }
}

impl fmt::Display for UniquenessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Query Descriptor ==
/// What the resolver needs to know about a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// None when the request named no recognisable scope
    pub scope: Option<QueryScope>,
    pub is_admin_caller: bool,
    /// The caller explicitly asked to skip every cache tier
    pub bypass: bool,
}

impl QueryDescriptor {
    pub fn public(scope: QueryScope) -> Self {
        Self {
            scope: Some(scope),
            is_admin_caller: false,
            bypass: false,
        }
    }

    pub fn admin(scope: QueryScope) -> Self {
        Self {
            scope: Some(scope),
            is_admin_caller: true,
            bypass: false,
        }
    }

    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }
}

// == Single Item Policy ==
/// Deployment choice for public single-post reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleItemPolicy {
    #[default]
    ShortTtl,
    Live,
    NoStore,
}

impl FromStr for SingleItemPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short_ttl" | "short-ttl" | "ttl" => Ok(SingleItemPolicy::ShortTtl),
            "live" => Ok(SingleItemPolicy::Live),
            "no_store" | "no-store" | "private_no_store" => Ok(SingleItemPolicy::NoStore),
            other => Err(format!("unknown single item policy '{}'", other)),
        }
    }
}

// == Policy Resolver ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyResolver {
    category_ttl: u64,
    single_item: SingleItemPolicy,
    single_item_ttl: u64,
}

impl PolicyResolver {
    pub fn new(category_ttl: u64, single_item: SingleItemPolicy, single_item_ttl: u64) -> Self {
        Self {
            category_ttl,
            single_item,
            single_item_ttl,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.category_feed_ttl,
            config.single_item_policy,
            config.single_item_ttl,
        )
    }

    /// Maps a query to its caching directive.
    ///
    /// Admin callers, explicit bypass requests and unrecognised scopes all
    /// get PRIVATE_NO_STORE.
    pub fn resolve(&self, query: &QueryDescriptor) -> CachePolicy {
        let Some(scope) = query.scope else {
            return CachePolicy::private_no_store();
        };
        if query.is_admin_caller || query.bypass {
            return CachePolicy::private_no_store();
        }

        match scope {
            QueryScope::Homepage => CachePolicy::private_no_store(),
            QueryScope::Category => CachePolicy::short_ttl(self.category_ttl),
            QueryScope::Admin => CachePolicy::private_no_store(),
            QueryScope::Item => match self.single_item {
                SingleItemPolicy::ShortTtl => CachePolicy::short_ttl(self.single_item_ttl),
                SingleItemPolicy::Live => CachePolicy::live(),
                SingleItemPolicy::NoStore => CachePolicy::private_no_store(),
            },
        }
    }
}

impl Default for PolicyResolver {
    fn default() -> Self {
        Self::new(CATEGORY_FEED_TTL, SingleItemPolicy::ShortTtl, CATEGORY_FEED_TTL)
    }
}
