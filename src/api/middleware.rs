//! Maintenance Middleware
//!
//! Runs the maintenance gate ahead of every route. Held requests never
//! reach a handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::handlers::{render_maintenance, AppState};
use crate::freshness::GateDecision;

/// Serves the maintenance notice for gated routes while maintenance is on.
pub async fn maintenance_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.gate.check(request.uri().path()).await {
        GateDecision::Maintenance(current) => render_maintenance(&current, state.retry_after),
        GateDecision::Exempt | GateDecision::PassThrough => next.run(request).await,
    }
}
