//! Reference-image backend.
//!
//! Sends up to [`MAX_REFERENCE_IMAGES`] character photos inline with the
//! prompt so the model can keep likeness across scenes, and supports the two
//! [`StyleVariant`]s. Speaks the Generative Language `generateContent`
//! protocol with inline image parts.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use storyme_core::character::CharacterDescriptor;
use storyme_core::prompt::{render_prompt, StyleVariant};

use crate::config::ReferenceImageConfig;
use crate::error::ProviderError;
use crate::http::{parse_response, transport_error};
use crate::provider::{GenerationOutput, GenerationRequest, ImageData, ImageProvider, ProviderKind};

/// Most reference photos accepted per call.
pub const MAX_REFERENCE_IMAGES: usize = 5;

/// Variant used when a request does not pick one.
pub const DEFAULT_VARIANT: StyleVariant = StyleVariant::Volumetric;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// A downloaded reference photo tied to the character it shows.
#[derive(Debug)]
struct ReferencePhoto {
    character: String,
    inline: InlineData,
}

/// HTTP client for the reference-image backend.
pub struct ReferenceImageProvider {
    client: reqwest::Client,
    config: ReferenceImageConfig,
}

impl ReferenceImageProvider {
    pub fn new(config: ReferenceImageConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, config: ReferenceImageConfig) -> Self {
        Self { client, config }
    }

    fn name(&self) -> &'static str {
        ProviderKind::ReferenceImage.as_str()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Download the first [`MAX_REFERENCE_IMAGES`] reference photos
    /// concurrently. Photos that cannot be fetched are skipped; the
    /// character is still described in the prompt text.
    async fn fetch_references(&self, characters: &[CharacterDescriptor]) -> Vec<ReferencePhoto> {
        let with_photo: Vec<&CharacterDescriptor> = characters
            .iter()
            .filter(|c| c.reference_image_url.is_some())
            .collect();
        if with_photo.len() > MAX_REFERENCE_IMAGES {
            tracing::warn!(
                provider = self.name(),
                supplied = with_photo.len(),
                kept = MAX_REFERENCE_IMAGES,
                "Too many reference photos, extra photos dropped",
            );
        }

        let downloads = with_photo
            .into_iter()
            .take(MAX_REFERENCE_IMAGES)
            .map(|c| async move {
                let url = c.reference_image_url.as_deref().unwrap_or_default();
                match self.fetch_photo(url).await {
                    Ok(inline) => Some(ReferencePhoto {
                        character: c.name.clone(),
                        inline,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            provider = self.name(),
                            character_id = %c.id,
                            error = %e,
                            "Reference photo could not be fetched, continuing without it",
                        );
                        None
                    }
                }
            });

        join_all(downloads).await.into_iter().flatten().collect()
    }

    async fn fetch_photo(&self, url: &str) -> Result<InlineData, ProviderError> {
        if let Some(inline) = parse_data_url(url) {
            return Ok(inline);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.name()))?;
        let response = crate::http::ensure_success(response, self.name()).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| "image/png".to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.name()))?;

        Ok(InlineData {
            mime_type,
            data: STANDARD.encode(&bytes),
        })
    }
}

#[async_trait]
impl ImageProvider for ReferenceImageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ReferenceImage
    }

    fn is_available(&self) -> bool {
        self.config.api_key.is_some() && !self.config.base_url.trim().is_empty()
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, ProviderError> {
        let Some(api_key) = &self.config.api_key else {
            return Err(ProviderError::Unavailable(
                "reference-image provider is not configured (REFERENCE_PROVIDER_API_KEY)"
                    .to_string(),
            ));
        };

        let started = Instant::now();
        let photos = self.fetch_references(&request.characters).await;

        let variant = request.variant.unwrap_or(DEFAULT_VARIANT);
        let prompt = reference_prompt(request, variant, &photos);

        let mut parts = vec![json!({ "text": prompt })];
        parts.extend(photos.iter().map(|p| json!({ "inlineData": p.inline })));

        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.name()))?;

        let parsed: GenerateContentResponse = parse_response(response, self.name()).await?;
        let image = extract_image(parsed, self.name())?;
        let generation_time_secs = started.elapsed().as_secs_f64();

        tracing::debug!(
            provider = self.name(),
            model = %self.config.model,
            variant = %variant,
            references = photos.len(),
            generation_time_secs,
            "Reference image generated",
        );

        Ok(GenerationOutput {
            image,
            prompt_used: prompt,
            generation_time_secs,
        })
    }
}

/// Full prompt text: the shared layout plus a legend mapping each inline
/// photo to its character.
fn reference_prompt(
    request: &GenerationRequest,
    variant: StyleVariant,
    photos: &[ReferencePhoto],
) -> String {
    let mut prompt = render_prompt(
        &request.style_directives,
        Some(variant),
        request.strategy,
        &request.scene_text,
        &request.characters,
    );
    if !photos.is_empty() {
        let legend: Vec<String> = photos
            .iter()
            .enumerate()
            .map(|(i, p)| format!("- Image {}: {}", i + 1, p.character))
            .collect();
        prompt.push_str("\n\nReference photos (match each character's appearance):\n");
        prompt.push_str(&legend.join("\n"));
    }
    prompt
}

fn extract_image(
    response: GenerateContentResponse,
    provider: &str,
) -> Result<ImageData, ProviderError> {
    let mut text_reply = None;
    for part in response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
    {
        match part {
            Part::InlineData { inline_data } if inline_data.mime_type.starts_with("image/") => {
                let data = STANDARD.decode(inline_data.data.trim()).map_err(|e| {
                    ProviderError::provider(provider, format!("Invalid base64 image: {e}"))
                })?;
                return Ok(ImageData::Bytes {
                    data,
                    mime_type: inline_data.mime_type,
                });
            }
            Part::Text { text } => {
                text_reply.get_or_insert(text);
            }
            Part::InlineData { .. } => {}
        }
    }

    let message = match text_reply {
        Some(text) => format!("No image returned; model replied with text: {}", text.trim()),
        None => "No image returned".to_string(),
    };
    Err(ProviderError::provider(provider, message))
}

/// Decode a `data:image/...;base64,...` URL without a network round trip.
fn parse_data_url(url: &str) -> Option<InlineData> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let mime_type = meta.strip_suffix(";base64")?;
    Some(InlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}
