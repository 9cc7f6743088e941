use std::sync::Arc;

use storyme_pipeline::orchestrator::GenerationPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Batch and preview generation service, including the provider
    /// registry and image store.
    pub pipeline: Arc<GenerationPipeline>,
}
