//! Content Records
//!
//! Posts, categories and the site settings document as the content store
//! hands them out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maintenance text shown when an admin enables maintenance without one.
pub const DEFAULT_MAINTENANCE_MESSAGE: &str =
    "We are currently performing maintenance. Please check back soon!";

// == Post ==
/// A blog post as served by content feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    /// Category name the post is filed under
    pub category: String,
    pub author: String,
    pub published: bool,
    pub show_on_homepage: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub views: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// == Category ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

// == Maintenance State ==
/// Site-wide maintenance flag and the message shown while it is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceState {
    pub enabled: bool,
    pub message: String,
}

impl MaintenanceState {
    /// The state every site boots into: maintenance off.
    pub fn normal() -> Self {
        Self {
            enabled: false,
            message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
        }
    }
}

impl Default for MaintenanceState {
    fn default() -> Self {
        Self::normal()
    }
}

// == Site Settings ==
/// The singleton settings document.
///
/// The maintenance flag and the cache epoch share this document so both
/// survive a restart together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_description: String,
    pub posts_per_page: u32,
    pub maintenance_mode: bool,
    pub maintenance_message: String,
    /// Highest cache epoch ever persisted
    #[serde(default)]
    pub epoch: u64,
}

impl SiteSettings {
    pub fn maintenance(&self) -> MaintenanceState {
        MaintenanceState {
            enabled: self.maintenance_mode,
            message: self.maintenance_message.clone(),
        }
    }

    /// Applies a partial update. A blank maintenance message falls back to
    /// the default one.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(name) = &patch.site_name {
            self.site_name = name.clone();
        }
        if let Some(description) = &patch.site_description {
            self.site_description = description.clone();
        }
        if let Some(per_page) = patch.posts_per_page {
            self.posts_per_page = per_page;
        }
        if let Some(enabled) = patch.maintenance_mode {
            self.maintenance_mode = enabled;
        }
        if let Some(message) = &patch.maintenance_message {
            self.maintenance_message = if message.trim().is_empty() {
                DEFAULT_MAINTENANCE_MESSAGE.to_string()
            } else {
                message.clone()
            };
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "CyberSage".to_string(),
            site_description: "Find the Answers Just When you Think of the Questions".to_string(),
            posts_per_page: 10,
            maintenance_mode: false,
            maintenance_message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
            epoch: 0,
        }
    }
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub site_description: Option<String>,
    #[serde(default)]
    pub posts_per_page: Option<u32>,
    #[serde(default)]
    pub maintenance_mode: Option<bool>,
    #[serde(default)]
    pub maintenance_message: Option<String>,
}

// == Drafts ==
/// Fields accepted when creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: String,
    pub category: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub show_on_homepage: bool,
    #[serde(default)]
    pub featured: bool,
}

fn default_author() -> String {
    "Admin".to_string()
}

/// Fields accepted when updating a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
    #[serde(default)]
    pub show_on_homepage: Option<bool>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl PostPatch {
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            post.slug = slug.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(category) = &self.category {
            post.category = category.clone();
        }
        if let Some(published) = self.published {
            post.published = published;
        }
        if let Some(show) = self.show_on_homepage {
            post.show_on_homepage = show;
        }
        if let Some(featured) = self.featured {
            post.featured = featured;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Fields accepted when updating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(slug) = &self.slug {
            category.slug = slug.clone();
        }
        if let Some(description) = &self.description {
            category.description = description.clone();
        }
    }
}
