pub mod generation;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate-images                                 batch scene illustration (POST)
/// /generate-preview                                character / cover preview (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(generation::router())
}
