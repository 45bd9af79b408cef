//! Freshness Module
//!
//! Server side of the content freshness layer:
//! - Cache policy resolution per query scope
//! - The invalidation coordinator and its epoch
//! - The maintenance gate

mod epoch;
mod gate;
mod policy;


pub use epoch::{ClearReport, InvalidationCoordinator, LocalCache};
pub use gate::{GateDecision, MaintenanceGate, MAINTENANCE_PATH, MAINTENANCE_STATUS_PATH};
pub use policy::{
    CacheDirective, CachePolicy, PolicyResolver, QueryDescriptor, SingleItemPolicy,
    UniquenessToken, CATEGORY_FEED_TTL,
};
