//! Blog Freshness - content freshness and cache consistency for a blog
//!
//! Decides how long each kind of content response may be reused, makes
//! every write visible to the next read through a process-wide cache epoch,
//! gates the public site behind a maintenance switch, and keeps open client
//! views current.

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod freshness;
pub mod models;
pub mod sync;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
