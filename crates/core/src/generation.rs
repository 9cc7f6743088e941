//! Per-scene generation results and the batch summary.
//!
//! Each scene moves `pending -> completed` or `pending -> failed`, both
//! terminal. The transitions consume the pending value so a finished result
//! cannot be moved back.

use serde::{Deserialize, Serialize};

use crate::character::CharacterDescriptor;
use crate::script::Scene;

/// Lifecycle of one scene's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Completed,
    Failed,
}

/// Placeholder rating slot for one character in a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRating {
    pub character_id: String,
    pub character_name: String,
    pub rating: Option<u8>,
}

/// The image produced (or not) for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub id: String,
    pub scene_id: String,
    pub scene_number: u32,
    /// Display text shown with the image.
    pub scene_description: String,
    pub image_url: String,
    /// Exact text sent to the provider, or the scene description when the
    /// scene failed before a prompt was sent.
    pub prompt: String,
    /// Seconds spent generating.
    pub generation_time: f64,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub character_ratings: Vec<CharacterRating>,
}

impl GeneratedImage {
    /// A pending result for `scene` with one rating slot per character.
    pub fn pending(scene: &Scene, characters: &[CharacterDescriptor]) -> Self {
        Self {
            id: format!("{}-image", scene.id),
            scene_id: scene.id.clone(),
            scene_number: scene.scene_number,
            scene_description: scene.description.clone(),
            image_url: String::new(),
            prompt: scene.description.clone(),
            generation_time: 0.0,
            status: GenerationStatus::Pending,
            error: None,
            character_ratings: characters
                .iter()
                .map(|c| CharacterRating {
                    character_id: c.id.clone(),
                    character_name: c.name.clone(),
                    rating: None,
                })
                .collect(),
        }
    }

    /// Transition to `completed`.
    pub fn complete(self, image_url: String, prompt: String, generation_time: f64) -> Self {
        debug_assert_eq!(self.status, GenerationStatus::Pending);
        Self {
            image_url,
            prompt,
            generation_time,
            status: GenerationStatus::Completed,
            error: None,
            ..self
        }
    }

    /// Transition to `failed`. The prompt falls back to the scene
    /// description and the generation time to zero.
    pub fn fail(self, error: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, GenerationStatus::Pending);
        Self {
            image_url: String::new(),
            prompt: self.scene_description.clone(),
            generation_time: 0.0,
            status: GenerationStatus::Failed,
            error: Some(error.into()),
            ..self
        }
    }
}

/// Format a per-scene error for the batch error list.
pub fn scene_error(scene_number: u32, message: &str) -> String {
    format!("Scene {scene_number}: {message}")
}

/// Aggregated outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// True iff no scene failed.
    pub success: bool,
    /// One entry per scene, ordered by scene number.
    pub generated_images: Vec<GeneratedImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub total_scenes: usize,
    pub successful_scenes: usize,
    /// Backend that served the batch.
    pub provider: String,
}

impl BatchResult {
    /// Summarize finished scene results.
    pub fn from_images(mut generated_images: Vec<GeneratedImage>, provider: &str) -> Self {
        generated_images.sort_by_key(|img| img.scene_number);

        let errors: Vec<String> = generated_images
            .iter()
            .filter(|img| img.status != GenerationStatus::Completed)
            .map(|img| {
                scene_error(
                    img.scene_number,
                    img.error.as_deref().unwrap_or("Generation did not complete"),
                )
            })
            .collect();

        let successful_scenes = generated_images
            .iter()
            .filter(|img| img.status == GenerationStatus::Completed)
            .count();

        Self {
            success: errors.is_empty(),
            total_scenes: generated_images.len(),
            successful_scenes,
            generated_images,
            errors,
            provider: provider.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
