//! Batch generation orchestrator.
//!
//! Turns one script and roster into one image per scene. Runs the whole
//! lifecycle:
//! 1. Validate the roster, script and art style.
//! 2. Parse scenes and build the batch-wide [`SettingMap`].
//! 3. Resolve the provider once for the batch.
//! 4. Generate scenes one at a time, in scene order, each under its own
//!    timeout and within the batch time budget. A failed scene is recorded
//!    and the batch moves on; scenes left when the budget runs out are
//!    marked failed without a provider call.
//! 5. Summarize into a [`BatchResult`].

use std::sync::Arc;
use std::time::Duration;

use storyme_core::character::{
    any_reference_photo, assemble_descriptors, validate_roster, Character,
};
use storyme_core::error::CoreError;
use storyme_core::generation::{BatchResult, GeneratedImage};
use storyme_core::logging::LogPolicy;
use storyme_core::prompt::{
    compose_scene_text, style_directives, validate_art_style, DEFAULT_ART_STYLE,
};
use storyme_core::script::{parse_script, validate_scenes, validate_script, Scene};
use storyme_core::setting::SettingMap;
use storyme_core::subject::KeywordTables;
use storyme_providers::error::ProviderError;
use storyme_providers::provider::{GenerationRequest, ImageData, ImageProvider};
use storyme_providers::registry::{ProviderRegistry, ProviderSelection};
use tokio::time::Instant;
use url::Url;

use crate::storage::ImageStore;

/// Default wall-clock budget for one scene, in seconds.
pub const DEFAULT_SCENE_TIMEOUT_SECS: u64 = 180;

/// Error recorded on scenes that never started because the batch ran out
/// of time.
pub const BATCH_BUDGET_EXHAUSTED: &str = "batch time budget exhausted";

/// Default public origin used to absolutize relative URLs.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Origin relative reference image URLs are resolved against.
    pub public_base_url: Url,
    pub scene_timeout: Duration,
    /// Wall-clock budget for a whole batch. Unset means unbounded.
    pub batch_timeout: Option<Duration>,
    /// Style used when a request supplies none.
    pub default_art_style: String,
    pub log_policy: LogPolicy,
    /// Subject keyword tables for preview classification.
    pub keyword_tables: KeywordTables,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            public_base_url: Url::parse(DEFAULT_PUBLIC_BASE_URL)
                .expect("DEFAULT_PUBLIC_BASE_URL must be a valid URL"),
            scene_timeout: Duration::from_secs(DEFAULT_SCENE_TIMEOUT_SECS),
            batch_timeout: None,
            default_art_style: DEFAULT_ART_STYLE.to_string(),
            log_policy: LogPolicy::default(),
            keyword_tables: KeywordTables::default(),
        }
    }
}

/// Batch-level failures. Per-scene failures never surface here; they are
/// recorded on the scene's [`GeneratedImage`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every preview variant failed.
    #[error("Preview generation failed: {0}")]
    PreviewFailed(String),
}

/// Input for one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub characters: Vec<Character>,
    pub script: String,
    pub art_style: Option<String>,
    pub selection: ProviderSelection,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Generation service held in application state.
pub struct GenerationPipeline {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn ImageStore>,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn ImageStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generate one image per scene of `request.script`.
    ///
    /// Returns an error only for input validation or when no provider can
    /// serve the batch; in both cases no provider call has been made.
    pub async fn generate_batch(
        &self,
        request: &BatchRequest,
    ) -> Result<BatchResult, PipelineError> {
        validate_roster(&request.characters)?;
        validate_script(&request.script)?;
        if let Some(style) = &request.art_style {
            validate_art_style(style)?;
        }

        let scenes = parse_script(&request.script, &request.characters);
        validate_scenes(&scenes)?;
        let settings = SettingMap::build(&scenes);

        let has_photos = any_reference_photo(&request.characters, &self.config.public_base_url);
        let provider = self
            .registry
            .resolve(request.selection.with_reference_photos(has_photos))?;
        let style = style_directives(request.art_style.as_deref(), &self.config.default_art_style);

        tracing::info!(
            scenes = scenes.len(),
            characters = request.characters.len(),
            locations = settings.len(),
            provider = %provider.kind(),
            "Starting scene generation batch",
        );

        let deadline = self.config.batch_timeout.map(|budget| Instant::now() + budget);
        let mut images = Vec::with_capacity(scenes.len());
        for scene in &scenes {
            let image = self
                .generate_scene(
                    provider.as_ref(),
                    scene,
                    &settings,
                    &request.characters,
                    &style,
                    deadline,
                )
                .await;
            images.push(image);
        }

        let result = BatchResult::from_images(images, provider.kind().as_str());
        tracing::info!(
            total = result.total_scenes,
            successful = result.successful_scenes,
            failed = result.total_scenes - result.successful_scenes,
            provider = %result.provider,
            "Scene generation batch finished",
        );
        Ok(result)
    }

    /// Generate one scene. Never fails: errors become a `failed` result.
    async fn generate_scene(
        &self,
        provider: &dyn ImageProvider,
        scene: &Scene,
        settings: &SettingMap,
        roster: &[Character],
        style: &str,
        deadline: Option<Instant>,
    ) -> GeneratedImage {
        let policy = self.config.log_policy;
        let characters = assemble_descriptors(
            roster,
            &scene.character_names,
            &self.config.public_base_url,
        );
        let pending = GeneratedImage::pending(scene, &characters);

        // The scene timeout is capped by whatever is left of the batch budget.
        let timeout = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!(
                        scene_number = scene.scene_number,
                        "Batch time budget exhausted, scene skipped",
                    );
                    return pending.fail(BATCH_BUDGET_EXHAUSTED);
                }
                remaining.min(self.config.scene_timeout)
            }
            None => self.config.scene_timeout,
        };

        let scene_text = compose_scene_text(&scene.description, settings.for_scene(scene));
        let request = GenerationRequest::new(characters, scene_text, style);

        tracing::debug!(
            scene_number = scene.scene_number,
            location = policy.content(scene.location.as_deref().unwrap_or("none")),
            description = policy.content(&scene.description),
            "Generating scene",
        );

        let call = tokio::time::timeout(timeout, provider.generate(&request));
        let outcome = match call.await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!("no response after {timeout:?}"))),
        };

        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    scene_number = scene.scene_number,
                    code = e.code(),
                    error = %e,
                    "Scene generation failed",
                );
                return pending.fail(e.to_string());
            }
        };

        let image_url = match self.publish(output.image, &pending.id).await {
            Ok(url) => url,
            Err(message) => {
                tracing::warn!(
                    scene_number = scene.scene_number,
                    error = %message,
                    "Storing scene image failed",
                );
                return pending.fail(message);
            }
        };

        tracing::debug!(
            scene_number = scene.scene_number,
            generation_time_secs = output.generation_time_secs,
            prompt = policy.content(&output.prompt_used),
            "Scene generated",
        );

        pending.complete(image_url, output.prompt_used, output.generation_time_secs)
    }

    /// Turn provider output into a public URL, uploading bytes when needed.
    pub(crate) async fn publish(&self, image: ImageData, key: &str) -> Result<String, String> {
        match image {
            ImageData::Url(url) => Ok(url),
            ImageData::Bytes { data, mime_type } => self
                .store
                .store(&data, &mime_type, key)
                .await
                .map_err(|e| e.to_string()),
        }
    }
}
