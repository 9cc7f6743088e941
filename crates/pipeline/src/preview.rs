//! Character and cover previews.
//!
//! A preview renders one subject in both [`StyleVariant`]s at once so the
//! user can pick a look before committing to a full batch. Both variants run
//! concurrently and each outcome is captured on its own: one variant failing
//! does not cancel or hide the other.

use futures::future::join;
use serde::{Deserialize, Serialize};
use storyme_core::character::{resolve_reference_url, CharacterDescription, CharacterDescriptor};
use storyme_core::error::CoreError;
use storyme_core::generation::GenerationStatus;
use storyme_core::prompt::{
    compose_scene_text, style_directives, validate_art_style, StyleVariant,
};
use storyme_core::subject::{
    classify, ClassificationSource, GenerationStrategy, SubjectType,
};
use storyme_providers::error::ProviderError;
use storyme_providers::provider::{GenerationRequest, ImageProvider};
use storyme_providers::registry::ProviderSelection;

use crate::orchestrator::{GenerationPipeline, PipelineError};

/// Name used when the caller gives none.
const UNNAMED_SUBJECT: &str = "the character";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewKind {
    #[default]
    Character,
    Cover,
}

/// Input for one preview.
#[derive(Debug, Clone, Default)]
pub struct PreviewRequest {
    pub kind: PreviewKind,
    pub name: Option<String>,
    pub reference_image_url: Option<String>,
    /// Free-text label such as "friendly dragon".
    pub character_type: Option<String>,
    pub description: Option<String>,
    /// Explicit subject type; skips keyword classification.
    pub subject_hint: Option<SubjectType>,
    /// Book title, required for covers.
    pub title: Option<String>,
    pub art_style: Option<String>,
    pub selection: ProviderSelection,
}

/// Result of one style variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOutcome {
    pub variant: StyleVariant,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub generation_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VariantOutcome {
    fn failed(variant: StyleVariant, error: String) -> Self {
        Self {
            variant,
            status: GenerationStatus::Failed,
            image_url: None,
            prompt: None,
            generation_time: 0.0,
            error: Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GenerationStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub subject_type: SubjectType,
    pub classified_by: ClassificationSource,
    pub strategy: GenerationStrategy,
    /// One entry per variant, in [`StyleVariant::ALL`] order.
    pub variants: Vec<VariantOutcome>,
    pub provider: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validate a preview request before any provider call.
pub fn validate_preview(request: &PreviewRequest) -> Result<(), CoreError> {
    if non_blank(&request.reference_image_url).is_none()
        && non_blank(&request.character_type).is_none()
    {
        return Err(CoreError::Validation(
            "Provide a reference image or a character type".into(),
        ));
    }
    if request.kind == PreviewKind::Cover && non_blank(&request.title).is_none() {
        return Err(CoreError::Validation("Cover preview requires a title".into()));
    }
    if let Some(style) = &request.art_style {
        validate_art_style(style)?;
    }
    Ok(())
}

/// Scene text describing what the preview shows.
fn preview_scene(request: &PreviewRequest, name: &str) -> String {
    let subject = match non_blank(&request.character_type) {
        Some(kind) => format!("{name}, a {kind}"),
        None => name.to_string(),
    };
    let description = match request.kind {
        PreviewKind::Character => format!(
            "A full-body character portrait of {subject}, facing the viewer on a plain soft background."
        ),
        PreviewKind::Cover => format!(
            "A storybook cover illustration for \"{}\" featuring {subject}, with open space at the top for the title.",
            non_blank(&request.title).unwrap_or_default()
        ),
    };
    compose_scene_text(&description, None)
}

// ---------------------------------------------------------------------------
// Pipeline entry point
// ---------------------------------------------------------------------------

impl GenerationPipeline {
    /// Classify the subject and render it in both style variants.
    ///
    /// Fails only on invalid input, when no provider is available, or when
    /// neither variant produced an image.
    pub async fn generate_preview(
        &self,
        request: &PreviewRequest,
    ) -> Result<PreviewResult, PipelineError> {
        validate_preview(request)?;

        let classification = classify(
            request.subject_hint,
            request.character_type.as_deref(),
            &self.config().keyword_tables,
        );
        let has_photo = non_blank(&request.reference_image_url).is_some();
        let provider = self
            .registry()
            .resolve(request.selection.with_reference_photos(has_photo))?;

        let name = non_blank(&request.name).unwrap_or(UNNAMED_SUBJECT).to_string();
        let descriptor = CharacterDescriptor {
            id: "preview".to_string(),
            name: name.clone(),
            reference_image_url: non_blank(&request.reference_image_url)
                .and_then(|raw| resolve_reference_url(raw, &self.config().public_base_url)),
            description: CharacterDescription {
                other_features: non_blank(&request.description).map(str::to_string),
                ..Default::default()
            },
        };

        let base = GenerationRequest::new(
            vec![descriptor],
            preview_scene(request, &name),
            style_directives(request.art_style.as_deref(), &self.config().default_art_style),
        )
        .with_strategy(classification.strategy);

        tracing::info!(
            kind = ?request.kind,
            subject_type = classification.subject_type.as_str(),
            classified_by = ?classification.source,
            provider = %provider.kind(),
            "Generating preview variants",
        );

        let preview_id = uuid::Uuid::new_v4();
        let [first, second] = StyleVariant::ALL;
        let (a, b) = join(
            self.run_variant(provider.as_ref(), &base, first, preview_id),
            self.run_variant(provider.as_ref(), &base, second, preview_id),
        )
        .await;
        let variants = vec![a, b];

        if !variants.iter().any(VariantOutcome::is_completed) {
            let reasons: Vec<String> = variants
                .iter()
                .filter_map(|v| v.error.as_ref().map(|e| format!("{}: {e}", v.variant)))
                .collect();
            return Err(PipelineError::PreviewFailed(reasons.join("; ")));
        }

        Ok(PreviewResult {
            subject_type: classification.subject_type,
            classified_by: classification.source,
            strategy: classification.strategy,
            variants,
            provider: provider.kind().to_string(),
        })
    }

    async fn run_variant(
        &self,
        provider: &dyn ImageProvider,
        base: &GenerationRequest,
        variant: StyleVariant,
        preview_id: uuid::Uuid,
    ) -> VariantOutcome {
        let request = base.clone().with_variant(variant);
        let timeout = self.config().scene_timeout;

        let output = match tokio::time::timeout(timeout, provider.generate(&request)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(variant = %variant, code = e.code(), error = %e, "Preview variant failed");
                return VariantOutcome::failed(variant, e.to_string());
            }
            Err(_) => {
                let e = ProviderError::Timeout(format!("no response after {timeout:?}"));
                tracing::warn!(variant = %variant, "Preview variant timed out");
                return VariantOutcome::failed(variant, e.to_string());
            }
        };

        let key = format!("preview-{preview_id}-{variant}");
        match self.publish(output.image, &key).await {
            Ok(url) => VariantOutcome {
                variant,
                status: GenerationStatus::Completed,
                image_url: Some(url),
                prompt: Some(output.prompt_used),
                generation_time: output.generation_time_secs,
                error: None,
            },
            Err(message) => {
                tracing::warn!(variant = %variant, error = %message, "Storing preview failed");
                VariantOutcome::failed(variant, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn character_request() -> PreviewRequest {
        PreviewRequest {
            name: Some("Sparky".into()),
            character_type: Some("friendly dragon".into()),
            ..Default::default()
        }
    }

    #[test]
    fn requires_image_or_type() {
        let err = validate_preview(&PreviewRequest::default()).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("reference image"));
    }

    #[test]
    fn cover_requires_title() {
        let request = PreviewRequest {
            kind: PreviewKind::Cover,
            ..character_request()
        };
        assert_matches!(validate_preview(&request), Err(CoreError::Validation(_)));
    }

    #[test]
    fn character_scene_mentions_type() {
        let text = preview_scene(&character_request(), "Sparky");
        assert!(text.starts_with("Scene: A full-body character portrait of Sparky, a friendly dragon"));
    }

    #[test]
    fn cover_scene_mentions_title() {
        let request = PreviewRequest {
            kind: PreviewKind::Cover,
            title: Some("The Big Adventure".into()),
            ..character_request()
        };
        assert!(preview_scene(&request, "Sparky").contains("\"The Big Adventure\""));
    }
}
