//! Content Store Module
//!
//! The gateway to persisted posts, categories and the settings document.
//! Everything above this layer talks to the store through [`ContentStore`].

mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Category, CategoryDraft, CategoryPatch, Post, PostDraft, PostPatch, QueryFilter, QueryScope,
    SettingsPatch, SiteSettings,
};

pub use memory::MemoryStore;

// == Store Error ==
/// Failures reported by a content store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store cannot be reached right now
    #[error("content store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A unique field is already taken
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}

// == Mutations ==
/// A content write.
#[derive(Debug, Clone)]
pub enum MutationOp {
    CreatePost(PostDraft),
    UpdatePost { id: u64, patch: PostPatch },
    DeletePost { id: u64 },
    CreateCategory(CategoryDraft),
    UpdateCategory { id: u64, patch: CategoryPatch },
    /// Refused while any post is still filed under the category
    DeleteCategory { id: u64 },
}

impl MutationOp {
    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            MutationOp::CreatePost(_) => "create_post",
            MutationOp::UpdatePost { .. } => "update_post",
            MutationOp::DeletePost { .. } => "delete_post",
            MutationOp::CreateCategory(_) => "create_category",
            MutationOp::UpdateCategory { .. } => "update_category",
            MutationOp::DeleteCategory { .. } => "delete_category",
        }
    }
}

/// What a successful write produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Post(Post),
    Category(Category),
    Deleted { id: u64 },
}

// == Content Store ==
/// Read/write contract of the persistent content collections.
///
/// Implementations own their own consistency; callers get no transaction
/// spanning a content write and the epoch bump that follows it.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Posts matching a logical scope, newest first.
    async fn query_content(
        &self,
        scope: QueryScope,
        filter: &QueryFilter,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError>;

    async fn mutate_content(&self, op: MutationOp) -> Result<MutationOutcome, StoreError>;

    async fn read_settings(&self) -> Result<SiteSettings, StoreError>;

    /// Applies a partial update and returns the committed document.
    async fn write_settings(&self, patch: SettingsPatch) -> Result<SiteSettings, StoreError>;

    /// Records `epoch` unless a higher value is already stored.
    async fn persist_epoch(&self, epoch: u64) -> Result<(), StoreError>;
}
