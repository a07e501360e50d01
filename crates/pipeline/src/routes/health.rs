//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use views::BootstrapState;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` once the turnstile summary view is ensured, `starting` before.
    pub status: &'static str,
    pub view: &'static str,
}

/// GET /health: liveness plus whether the summary view is in place.
///
/// Always answers 200; a view that is not yet ensured is retried by the
/// pipeline loop and does not make the process unhealthy.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let view = *state.view_state.read().await;
    let status = match view {
        BootstrapState::Ensured => "ok",
        _ => "starting",
    };
    Json(HealthResponse {
        status,
        view: view.as_str(),
    })
}
