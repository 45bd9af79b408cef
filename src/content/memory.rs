//! In-Memory Content Store
//!
//! Posts and categories live in memory. The settings document, which holds
//! the maintenance flag and the cache epoch, is written through to a JSON
//! file when a path is configured so an intended outage survives a crash.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::{ContentStore, MutationOp, MutationOutcome, StoreError};
use crate::models::{
    Category, CategoryDraft, CategoryPatch, Post, PostDraft, QueryFilter, QueryScope, SettingsPatch,
    SiteSettings,
};

// == Field Limits ==
const MAX_TITLE_LENGTH: usize = 100;
const MAX_EXCERPT_LENGTH: usize = 200;

#[derive(Debug, Default)]
struct Collections {
    posts: Vec<Post>,
    categories: Vec<Category>,
}

// == Memory Store ==
/// Content store backed by process memory plus an optional settings file.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    /// Held across the file write so writes land in commit order
    settings: Mutex<SiteSettings>,
    settings_path: Option<PathBuf>,
    available: AtomicBool,
    next_id: AtomicU64,
}

impl MemoryStore {
    // == Constructors ==
    /// Creates a store with default settings and nothing persisted.
    pub fn new() -> Self {
        Self::with_settings(SiteSettings::default(), None)
    }

    /// Opens a store whose settings document is persisted at `path`.
    ///
    /// A missing file starts from defaults; an unreadable one is an error
    /// rather than a silent reset of the maintenance flag.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<SiteSettings>(&bytes).map_err(|e| {
                StoreError::Invalid(format!("settings file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file at {}, starting from defaults", path.display());
                SiteSettings::default()
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self::with_settings(settings, Some(path)))
    }

    fn with_settings(settings: SiteSettings, settings_path: Option<PathBuf>) -> Self {
        Self {
            collections: RwLock::new(Collections::default()),
            settings: Mutex::new(settings),
            settings_path,
            available: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
        }
    }

    // == Availability ==
    /// Marks the store reachable or not. While unavailable every call fails
    /// with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // == Persistence ==
    async fn persist(&self, settings: &SiteSettings) -> Result<(), StoreError> {
        let Some(path) = &self.settings_path else {
            return Ok(());
        };
        write_atomically(path, settings).await
    }

    // == Writes ==
    async fn create_post(&self, draft: PostDraft) -> Result<Post, StoreError> {
        validate_post_fields(&draft.title, &draft.slug, &draft.excerpt, &draft.category)?;

        let mut collections = self.collections.write().await;
        if collections.posts.iter().any(|p| p.slug == draft.slug) {
            return Err(StoreError::Conflict(format!("slug '{}' already exists", draft.slug)));
        }

        let now = Utc::now();
        let post = Post {
            id: self.allocate_id(),
            title: draft.title,
            slug: draft.slug,
            excerpt: draft.excerpt,
            category: draft.category,
            author: draft.author,
            published: draft.published,
            show_on_homepage: draft.show_on_homepage,
            featured: draft.featured,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        collections.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: u64,
        patch: crate::models::PostPatch,
    ) -> Result<Post, StoreError> {
        let mut collections = self.collections.write().await;

        if let Some(slug) = &patch.slug {
            if collections.posts.iter().any(|p| p.id != id && &p.slug == slug) {
                return Err(StoreError::Conflict(format!("slug '{}' already exists", slug)));
            }
        }

        let post = collections
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("post {}", id)))?;

        let mut updated = post.clone();
        patch.apply_to(&mut updated);
        validate_post_fields(
            &updated.title,
            &updated.slug,
            &updated.excerpt,
            &updated.category,
        )?;
        updated.updated_at = Utc::now();
        *post = updated.clone();
        Ok(updated)
    }

    async fn delete_post(&self, id: u64) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let before = collections.posts.len();
        collections.posts.retain(|p| p.id != id);
        if collections.posts.len() == before {
            return Err(StoreError::NotFound(format!("post {}", id)));
        }
        Ok(())
    }

    async fn create_category(&self, draft: CategoryDraft) -> Result<Category, StoreError> {
        if draft.name.trim().is_empty() || draft.slug.trim().is_empty() {
            return Err(StoreError::Invalid(
                "category name and slug are required".to_string(),
            ));
        }

        let mut collections = self.collections.write().await;
        if collections
            .categories
            .iter()
            .any(|c| c.name == draft.name || c.slug == draft.slug)
        {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                draft.name
            )));
        }

        let category = Category {
            id: self.allocate_id(),
            name: draft.name,
            slug: draft.slug,
            description: draft.description,
        };
        collections.categories.push(category.clone());
        Ok(category)
    }

    /// Renaming a category re-files its posts under the new name.
    async fn update_category(
        &self,
        id: u64,
        patch: CategoryPatch,
    ) -> Result<Category, StoreError> {
        let mut collections = self.collections.write().await;

        let current = collections
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        if updated.name.trim().is_empty() || updated.slug.trim().is_empty() {
            return Err(StoreError::Invalid(
                "category name and slug are required".to_string(),
            ));
        }
        if collections
            .categories
            .iter()
            .any(|c| c.id != id && (c.name == updated.name || c.slug == updated.slug))
        {
            return Err(StoreError::Conflict(
                "category name or slug already exists".to_string(),
            ));
        }

        if updated.name != current.name {
            for post in collections
                .posts
                .iter_mut()
                .filter(|p| p.category.eq_ignore_ascii_case(&current.name))
            {
                post.category = updated.name.clone();
            }
        }

        if let Some(slot) = collections.categories.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_category(&self, id: u64) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;

        let name = collections
            .categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;

        let filed = collections
            .posts
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(&name))
            .count();
        if filed > 0 {
            return Err(StoreError::Invalid(format!(
                "cannot delete category '{}': it has {} posts, reassign or delete them first",
                name, filed
            )));
        }

        collections.categories.retain(|c| c.id != id);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn query_content(
        &self,
        scope: QueryScope,
        filter: &QueryFilter,
        limit: usize,
    ) -> Result<Vec<Post>, StoreError> {
        self.ensure_available()?;
        let collections = self.collections.read().await;

        let category_names = match &filter.category {
            Some(wanted) => Some(category_aliases(&collections.categories, wanted)),
            None if scope == QueryScope::Category => {
                return Err(StoreError::Invalid(
                    "category feed requires a category".to_string(),
                ))
            }
            None => None,
        };

        let slug = match (scope, &filter.slug) {
            (QueryScope::Item, None) => {
                return Err(StoreError::Invalid("item query requires a slug".to_string()))
            }
            (_, slug) => slug.as_deref(),
        };

        let mut posts: Vec<Post> = collections
            .posts
            .iter()
            .filter(|p| match scope {
                QueryScope::Homepage => p.published && p.show_on_homepage,
                QueryScope::Admin => true,
                QueryScope::Category | QueryScope::Item => p.published,
            })
            .filter(|p| match &category_names {
                Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(&p.category)),
                None => true,
            })
            .filter(|p| slug.map_or(true, |s| p.slug == s))
            .cloned()
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts.truncate(limit);

        debug!(scope = %scope, returned = posts.len(), "content query");
        Ok(posts)
    }

    async fn mutate_content(&self, op: MutationOp) -> Result<MutationOutcome, StoreError> {
        self.ensure_available()?;

        match op {
            MutationOp::CreatePost(draft) => self.create_post(draft).await.map(MutationOutcome::Post),
            MutationOp::UpdatePost { id, patch } => {
                self.update_post(id, patch).await.map(MutationOutcome::Post)
            }
            MutationOp::DeletePost { id } => {
                self.delete_post(id).await?;
                Ok(MutationOutcome::Deleted { id })
            }
            MutationOp::CreateCategory(draft) => self
                .create_category(draft)
                .await
                .map(MutationOutcome::Category),
            MutationOp::UpdateCategory { id, patch } => self
                .update_category(id, patch)
                .await
                .map(MutationOutcome::Category),
            MutationOp::DeleteCategory { id } => {
                self.delete_category(id).await?;
                Ok(MutationOutcome::Deleted { id })
            }
        }
    }

    async fn read_settings(&self) -> Result<SiteSettings, StoreError> {
        self.ensure_available()?;
        Ok(self.settings.lock().await.clone())
    }

    async fn write_settings(&self, patch: SettingsPatch) -> Result<SiteSettings, StoreError> {
        self.ensure_available()?;

        let mut settings = self.settings.lock().await;
        let mut next = settings.clone();
        next.apply(&patch);

        // Commit only once the document is durable
        self.persist(&next).await?;
        *settings = next.clone();
        Ok(next)
    }

    async fn persist_epoch(&self, epoch: u64) -> Result<(), StoreError> {
        self.ensure_available()?;

        let mut settings = self.settings.lock().await;
        if epoch <= settings.epoch {
            return Ok(());
        }

        let mut next = settings.clone();
        next.epoch = epoch;
        self.persist(&next).await?;
        *settings = next;
        Ok(())
    }
}

// == Helpers ==
/// Names a category filter may match: the filter itself plus the name of a
/// category whose slug equals it.
fn category_aliases(categories: &[Category], wanted: &str) -> Vec<String> {
    let mut names = vec![wanted.to_string()];
    names.extend(
        categories
            .iter()
            .filter(|c| c.slug.eq_ignore_ascii_case(wanted))
            .map(|c| c.name.clone()),
    );
    names
}

fn validate_post_fields(
    title: &str,
    slug: &str,
    excerpt: &str,
    category: &str,
) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::Invalid("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(StoreError::Invalid(format!(
            "title cannot be more than {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    if slug.trim().is_empty() {
        return Err(StoreError::Invalid("slug is required".to_string()));
    }
    if excerpt.chars().count() > MAX_EXCERPT_LENGTH {
        return Err(StoreError::Invalid(format!(
            "excerpt cannot be more than {} characters",
            MAX_EXCERPT_LENGTH
        )));
    }
    if category.trim().is_empty() {
        return Err(StoreError::Invalid("category is required".to_string()));
    }
    Ok(())
}

/// Writes the settings document to a sibling temp file, then renames it into
/// place.
async fn write_atomically(path: &Path, settings: &SiteSettings) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(settings)
        .map_err(|e| StoreError::Invalid(format!("encoding settings: {}", e)))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| StoreError::Unavailable(format!("writing {}: {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Unavailable(format!("replacing {}: {}", path.display(), e)))?;

    debug!(path = %path.display(), epoch = settings.epoch, "settings persisted");
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostPatch;

    fn draft(slug: &str, category: &str, published: bool, homepage: bool) -> PostDraft {
        PostDraft {
            title: format!("Post {}", slug),
            slug: slug.to_string(),
            excerpt: String::new(),
            category: category.to_string(),
            author: "Admin".to_string(),
            published,
            show_on_homepage: homepage,
            featured: false,
        }
    }

    fn temp_settings_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "blog_freshness_{}_{}_{}.json",
            name,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[tokio::test]
    async fn test_homepage_filters_unpublished_and_unflagged() {
        let store = MemoryStore::new();
        store
            .mutate_content(MutationOp::CreatePost(draft("a", "Tech", true, true)))
            .await
            .unwrap();
        store
            .mutate_content(MutationOp::CreatePost(draft("b", "Tech", false, true)))
            .await
            .unwrap();
        store
            .mutate_content(MutationOp::CreatePost(draft("c", "Tech", true, false)))
            .await
            .unwrap();

        let posts = store
            .query_content(QueryScope::Homepage, &QueryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "a");

        let all = store
            .query_content(QueryScope::Admin, &QueryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_category_feed_matches_slug_or_name() {
        let store = MemoryStore::new();
        store
            .mutate_content(MutationOp::CreateCategory(CategoryDraft {
                name: "Social Media".to_string(),
                slug: "social-media".to_string(),
                description: String::new(),
            }))
            .await
            .unwrap();
        store
            .mutate_content(MutationOp::CreatePost(draft("x", "Social Media", true, false)))
            .await
            .unwrap();

        let by_slug = QueryFilter {
            category: Some("social-media".to_string()),
            slug: None,
        };
        let posts = store
            .query_content(QueryScope::Category, &by_slug, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);

        let missing = store
            .query_content(QueryScope::Category, &QueryFilter::default(), 10)
            .await;
        assert!(matches!(missing, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let store = MemoryStore::new();
        store
            .mutate_content(MutationOp::CreatePost(draft("same", "Tech", true, true)))
            .await
            .unwrap();
        let result = store
            .mutate_content(MutationOp::CreatePost(draft("same", "Tech", true, true)))
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    fn category(name: &str, slug: &str) -> MutationOp {
        MutationOp::CreateCategory(CategoryDraft {
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
        })
    }

    async fn create_category(store: &MemoryStore, name: &str, slug: &str) -> u64 {
        match store.mutate_content(category(name, slug)).await.unwrap() {
            MutationOutcome::Category(c) => c.id,
            other => panic!("expected category, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_category_rename_refiles_posts() {
        let store = MemoryStore::new();
        let id = create_category(&store, "Tech", "tech").await;
        store
            .mutate_content(MutationOp::CreatePost(draft("p", "Tech", true, false)))
            .await
            .unwrap();

        store
            .mutate_content(MutationOp::UpdateCategory {
                id,
                patch: CategoryPatch {
                    name: Some("Technology".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let filter = QueryFilter {
            category: Some("tech".to_string()),
            slug: None,
        };
        let posts = store
            .query_content(QueryScope::Category, &filter, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].category, "Technology");
    }

    #[tokio::test]
    async fn test_category_update_conflicts_with_other_category() {
        let store = MemoryStore::new();
        create_category(&store, "Tech", "tech").await;
        let id = create_category(&store, "News", "news").await;

        let result = store
            .mutate_content(MutationOp::UpdateCategory {
                id,
                patch: CategoryPatch {
                    slug: Some("tech".to_string()),
                    ..Default::default()
                },
            })
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // Keeping its own name is not a conflict
        let result = store
            .mutate_content(MutationOp::UpdateCategory {
                id,
                patch: CategoryPatch {
                    name: Some("News".to_string()),
                    description: Some("Daily".to_string()),
                    ..Default::default()
                },
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_category_with_posts_cannot_be_deleted() {
        let store = MemoryStore::new();
        let id = create_category(&store, "Tech", "tech").await;
        store
            .mutate_content(MutationOp::CreatePost(draft("p", "Tech", false, false)))
            .await
            .unwrap();

        let result = store
            .mutate_content(MutationOp::DeleteCategory { id })
            .await;
        match result {
            Err(StoreError::Invalid(msg)) => assert!(msg.contains("1 posts")),
            other => panic!("expected refusal, got {:?}", other),
        }

        let empty = create_category(&store, "Empty", "empty").await;
        assert_eq!(
            store
                .mutate_content(MutationOp::DeleteCategory { id: empty })
                .await,
            Ok(MutationOutcome::Deleted { id: empty })
        );
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .mutate_content(MutationOp::UpdatePost {
                id: 42,
                patch: PostPatch::default(),
            })
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(
            store.read_settings().await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store
                .query_content(QueryScope::Homepage, &QueryFilter::default(), 8)
                .await,
            Err(StoreError::Unavailable(_))
        ));

        store.set_available(true);
        assert!(store.read_settings().await.is_ok());
    }

    #[tokio::test]
    async fn test_persist_epoch_keeps_maximum() {
        let store = MemoryStore::new();
        store.persist_epoch(10).await.unwrap();
        store.persist_epoch(7).await.unwrap();
        assert_eq!(store.read_settings().await.unwrap().epoch, 10);
    }

    #[tokio::test]
    async fn test_maintenance_flag_survives_reopen() {
        let path = temp_settings_path("reopen");

        {
            let store = MemoryStore::open(&path).await.unwrap();
            store
                .write_settings(SettingsPatch {
                    maintenance_mode: Some(true),
                    maintenance_message: Some("Migrating database".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            store.persist_epoch(99).await.unwrap();
        }

        let reopened = MemoryStore::open(&path).await.unwrap();
        let settings = reopened.read_settings().await.unwrap();
        assert!(settings.maintenance_mode);
        assert_eq!(settings.maintenance_message, "Migrating database");
        assert_eq!(settings.epoch, 99);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corrupt_settings_file_is_an_error() {
        let path = temp_settings_path("corrupt");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result = MemoryStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Invalid(_))));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
