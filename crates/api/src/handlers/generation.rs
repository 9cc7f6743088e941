//! Handlers for batch scene illustration.
//!
//! Routes:
//! - `POST /generate-images`  -- generate one image per scene of a script

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyme_core::character::Character;
use storyme_pipeline::orchestrator::BatchRequest;
use storyme_providers::provider::ProviderKind;
use storyme_providers::registry::ProviderSelection;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::state::AppState;

/// Request body for `POST /generate-images`.
///
/// `characters` and `script` default to empty so that missing fields get
/// the same validation messages as empty ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImagesRequest {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub script: String,
    pub art_style: Option<String>,
    /// Backend override (`text-prompt`, `reference-image` or an alias).
    pub provider: Option<String>,
    /// Whether an unavailable backend may be swapped for another.
    pub allow_fallback: Option<bool>,
}

/// Build a provider selection from the optional request fields.
pub(crate) fn provider_selection(
    provider: Option<&str>,
    allow_fallback: Option<bool>,
) -> AppResult<ProviderSelection> {
    let requested = provider
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<ProviderKind>().map_err(AppError::BadRequest))
        .transpose()?;
    Ok(ProviderSelection {
        requested,
        allow_fallback,
        ..Default::default()
    })
}

/// POST /generate-images
///
/// Runs the whole batch before responding. Per-scene failures come back in
/// the body with `success: false`; only validation and provider
/// unavailability produce an error status.
pub async fn generate_images(
    State(state): State<AppState>,
    AppJson(input): AppJson<GenerateImagesRequest>,
) -> AppResult<impl IntoResponse> {
    let selection = provider_selection(input.provider.as_deref(), input.allow_fallback)?;

    let request = BatchRequest {
        characters: input.characters,
        script: input.script,
        art_style: input.art_style,
        selection,
    };

    let result = state.pipeline.generate_batch(&request).await?;
    Ok(Json(result))
}
