//! Route definitions for image generation.
//!
//! Mounted both at the root and under `/api/v1`.
//!
//! ```text
//! POST   /generate-images                generate_images
//! POST   /generate-preview               generate_preview
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::{generation, preview};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate-images", post(generation::generate_images))
        .route("/generate-preview", post(preview::generate_preview))
}
