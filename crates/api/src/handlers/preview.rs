//! Handlers for character and cover previews.
//!
//! Routes:
//! - `POST /generate-preview`  -- render one subject in both style variants

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyme_core::error::CoreError;
use storyme_core::subject::SubjectType;
use storyme_pipeline::preview::{PreviewKind, PreviewRequest};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::handlers::generation::provider_selection;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /generate-preview`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePreviewRequest {
    #[serde(default)]
    pub kind: PreviewKind,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2048))]
    pub reference_image_url: Option<String>,
    #[validate(length(max = 200))]
    pub character_type: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Explicit subject type hint.
    pub subject_type: Option<SubjectType>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    pub art_style: Option<String>,
    pub provider: Option<String>,
    pub allow_fallback: Option<bool>,
}

/// POST /generate-preview
///
/// Character previews are open to everyone; cover previews require a
/// premium account.
pub async fn generate_preview(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    AppJson(input): AppJson<GeneratePreviewRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    if input.kind == PreviewKind::Cover {
        let user = user
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Cover previews require a signed-in account".into(),
                ))
            })?
            .require_premium()?;
        tracing::info!(user_id = %user.user_id, "Cover preview requested");
    }

    let request = PreviewRequest {
        kind: input.kind,
        name: input.name,
        reference_image_url: input.reference_image_url,
        character_type: input.character_type,
        description: input.description,
        subject_hint: input.subject_type,
        title: input.title,
        art_style: input.art_style,
        selection: provider_selection(input.provider.as_deref(), input.allow_fallback)?,
    };

    let result = state.pipeline.generate_preview(&request).await?;
    Ok(Json(result))
}
