//! Maintenance Gate
//!
//! Decides, before anything else runs, whether a request is served or sent
//! to the maintenance notice. State is read from the store on every check;
//! a failed read fails open.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::content::{ContentStore, StoreError};
use crate::freshness::InvalidationCoordinator;
use crate::models::{MaintenanceState, SettingsPatch, SiteSettings};

/// Path of the maintenance notice page.
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Path of the maintenance status endpoint.
pub const MAINTENANCE_STATUS_PATH: &str = "/maintenance-status";

// Route prefixes never gated: admin panel and the mutation API
const EXEMPT_PREFIXES: &[&str] = &["/admin", "/api"];
const EXEMPT_PATHS: &[&str] = &[MAINTENANCE_PATH, MAINTENANCE_STATUS_PATH, "/health"];

// == Gate Decision ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Route is never gated
    Exempt,
    /// Maintenance is off (or its state could not be read)
    PassThrough,
    /// Serve the maintenance notice with this state
    Maintenance(MaintenanceState),
}

// == Maintenance Gate ==
pub struct MaintenanceGate {
    store: Arc<dyn ContentStore>,
    coordinator: Arc<InvalidationCoordinator>,
}

impl MaintenanceGate {
    pub fn new(store: Arc<dyn ContentStore>, coordinator: Arc<InvalidationCoordinator>) -> Self {
        Self { store, coordinator }
    }

    // == Exemptions ==
    /// True for admin routes, the mutation API and the maintenance surface
    /// itself, which must stay reachable to avoid a redirect loop.
    pub fn is_exempt(path: &str) -> bool {
        EXEMPT_PATHS.contains(&path)
            || EXEMPT_PREFIXES
                .iter()
                .any(|prefix| path == *prefix || path.starts_with(&format!("{}/", prefix)))
    }

    // == State ==
    /// Reads the maintenance state straight from the store.
    pub async fn state(&self) -> Result<MaintenanceState, StoreError> {
        self.store
            .read_settings()
            .await
            .map(|settings| settings.maintenance())
    }

    /// Reads the maintenance state, treating a failed read as maintenance off.
    pub async fn current(&self) -> MaintenanceState {
        match self.state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Maintenance state unreadable, failing open: {}", e);
                MaintenanceState::normal()
            }
        }
    }

    // == Check ==
    pub async fn check(&self, path: &str) -> GateDecision {
        if Self::is_exempt(path) {
            return GateDecision::Exempt;
        }

        let state = self.current().await;
        if state.enabled {
            debug!(path, "Request held by maintenance gate");
            GateDecision::Maintenance(state)
        } else {
            GateDecision::PassThrough
        }
    }

    // == Settings Write ==
    /// Commits a settings update and bumps the epoch so cached
    /// maintenance-status reads are invalidated.
    ///
    /// Store failures are returned as-is; a rejected write is never retried.
    pub async fn write_settings(&self, patch: SettingsPatch) -> Result<SiteSettings, StoreError> {
        let settings = self.store.write_settings(patch).await?;
        let epoch = self.coordinator.bump().await;

        info!(
            maintenance = settings.maintenance_mode,
            epoch, "Site settings updated"
        );
        Ok(settings)
    }
}
