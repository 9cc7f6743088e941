//! The provider contract shared by every image backend.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyme_core::character::CharacterDescriptor;
use storyme_core::prompt::StyleVariant;
use storyme_core::subject::GenerationStrategy;

use crate::error::ProviderError;

// ---------------------------------------------------------------------------
// Provider kinds
// ---------------------------------------------------------------------------

/// The closed set of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Prompt-only text-to-image backend.
    #[serde(alias = "flux", alias = "text")]
    TextPrompt,
    /// Reference-photo driven backend with style variants.
    #[serde(alias = "gemini", alias = "reference")]
    ReferenceImage,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::ReferenceImage, ProviderKind::TextPrompt];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextPrompt => "text-prompt",
            Self::ReferenceImage => "reference-image",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text-prompt" | "text" | "flux" => Ok(Self::TextPrompt),
            "reference-image" | "reference" | "gemini" => Ok(Self::ReferenceImage),
            other => Err(format!(
                "Unknown image provider '{other}'. Must be one of: text-prompt, reference-image"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Everything a backend needs to produce one image.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub characters: Vec<CharacterDescriptor>,
    /// Scene description, canonical setting and negative constraints.
    pub scene_text: String,
    pub style_directives: String,
    pub variant: Option<StyleVariant>,
    pub strategy: Option<GenerationStrategy>,
}

impl GenerationRequest {
    pub fn new(
        characters: Vec<CharacterDescriptor>,
        scene_text: impl Into<String>,
        style_directives: impl Into<String>,
    ) -> Self {
        Self {
            characters,
            scene_text: scene_text.into(),
            style_directives: style_directives.into(),
            variant: None,
            strategy: None,
        }
    }

    pub fn with_variant(mut self, variant: StyleVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_strategy(mut self, strategy: GenerationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Image payload returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Already hosted; use as-is.
    Url(String),
    /// Raw bytes that must be uploaded to storage.
    Bytes { data: Vec<u8>, mime_type: String },
}

/// Successful backend result.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub image: ImageData,
    /// Exact prompt text sent to the backend.
    pub prompt_used: String,
    pub generation_time_secs: f64,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Uniform interface over image-generation backends.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether the backend is configured well enough to be called.
    fn is_available(&self) -> bool;

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, ProviderError>;
}
