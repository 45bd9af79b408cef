//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Feed cache sweep: drops TTL-expired and stale-epoch entries

mod cleanup;

pub use cleanup::spawn_cleanup_task;
