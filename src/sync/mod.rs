//! Freshness Synchronizer
//!
//! Client side of the freshness layer: keeps one mounted view of a content
//! feed current with a fixed-interval poll, offers a force refresh that
//! defeats every caching tier, and reconciles overlapping fetches by
//! generation so a late response never overwrites a newer one.

mod config;
mod source;
mod synchronizer;

use std::time::Duration;

use thiserror::Error;

pub use config::SyncConfig;
pub use source::{FeedSource, FetchOutcome, HttpFeedSource};
pub use synchronizer::{ApplyOutcome, FreshnessSynchronizer, RefreshOutcome, ViewState};

// == Sync Error ==
/// Failures seen by the synchronizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("force refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The view was unmounted; nothing will be applied
    #[error("view is no longer mounted")]
    Unmounted,
}

impl SyncError {
    /// True when trying again may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::Unmounted)
    }
}
