use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use storyme_providers::registry::ProviderStatus;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configuration readiness of each image backend.
    pub providers: Vec<ProviderStatus>,
}

/// GET /health -- returns service and image provider health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.pipeline.registry();
    let status = if registry.any_available() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        providers: registry.availability(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
