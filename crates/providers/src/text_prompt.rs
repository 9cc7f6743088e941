//! Prompt-only text-to-image backend.
//!
//! Characters are described in words; no image conditioning is sent. The
//! backend speaks a small JSON protocol:
//!
//! ```text
//! POST {endpoint}
//! Authorization: Bearer {api_key}
//! { "model": "...", "prompt": "...", "width": 1024, "height": 768 }
//!
//! 200 { "images": [ { "url": "https://..." } ] }
//!  or { "images": [ { "b64_json": "...", "content_type": "image/png" } ] }
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use storyme_core::prompt::render_prompt;

use crate::config::TextPromptConfig;
use crate::error::ProviderError;
use crate::http::{parse_response, transport_error};
use crate::provider::{GenerationOutput, GenerationRequest, ImageData, ImageProvider, ProviderKind};

/// Output width in pixels (landscape, storybook spread).
pub const IMAGE_WIDTH: u32 = 1024;
/// Output height in pixels.
pub const IMAGE_HEIGHT: u32 = 768;

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    images: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    url: Option<String>,
    b64_json: Option<String>,
    content_type: Option<String>,
}

/// HTTP client for the prompt-only backend.
pub struct TextPromptProvider {
    client: reqwest::Client,
    config: TextPromptConfig,
}

impl TextPromptProvider {
    pub fn new(config: TextPromptConfig, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling).
    pub fn with_client(client: reqwest::Client, config: TextPromptConfig) -> Self {
        Self { client, config }
    }

    fn name(&self) -> &'static str {
        ProviderKind::TextPrompt.as_str()
    }
}

#[async_trait]
impl ImageProvider for TextPromptProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TextPrompt
    }

    fn is_available(&self) -> bool {
        self.config.endpoint.is_some() && self.config.api_key.is_some()
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, ProviderError> {
        let (Some(endpoint), Some(api_key)) = (&self.config.endpoint, &self.config.api_key)
        else {
            return Err(ProviderError::Unavailable(
                "text-prompt provider is not configured (TEXT_PROVIDER_URL / TEXT_PROVIDER_API_KEY)"
                    .to_string(),
            ));
        };

        let prompt = render_prompt(
            &request.style_directives,
            request.variant,
            request.strategy,
            &request.scene_text,
            &request.characters,
        );

        let body = TextToImageRequest {
            model: &self.config.model,
            prompt: &prompt,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.name()))?;

        let parsed: TextToImageResponse = parse_response(response, self.name()).await?;
        let image = first_image(parsed, self.name())?;
        let generation_time_secs = started.elapsed().as_secs_f64();

        tracing::debug!(
            provider = self.name(),
            model = %self.config.model,
            generation_time_secs,
            "Text-prompt image generated",
        );

        Ok(GenerationOutput {
            image,
            prompt_used: prompt,
            generation_time_secs,
        })
    }
}

fn first_image(response: TextToImageResponse, provider: &str) -> Result<ImageData, ProviderError> {
    let item = response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::provider(provider, "Response contained no images"))?;

    if let Some(url) = item.url.filter(|u| !u.trim().is_empty()) {
        return Ok(ImageData::Url(url));
    }
    if let Some(encoded) = item.b64_json {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProviderError::provider(provider, format!("Invalid base64 image: {e}")))?;
        return Ok(ImageData::Bytes {
            data,
            mime_type: item.content_type.unwrap_or_else(|| "image/png".to_string()),
        });
    }
    Err(ProviderError::provider(
        provider,
        "Image entry had neither url nor b64_json",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_provider_is_unavailable() {
        let provider = TextPromptProvider::new(TextPromptConfig::default(), Duration::from_secs(5));
        assert!(!provider.is_available());
    }

    #[test]
    fn first_image_prefers_url() {
        let response = TextToImageResponse {
            images: vec![ImageItem {
                url: Some("https://img/1.png".into()),
                b64_json: Some("aGk=".into()),
                content_type: None,
            }],
        };
        assert_eq!(
            first_image(response, "p").unwrap(),
            ImageData::Url("https://img/1.png".into())
        );
    }

    #[test]
    fn first_image_decodes_base64() {
        let response = TextToImageResponse {
            images: vec![ImageItem {
                url: None,
                b64_json: Some("aGk=".into()),
                content_type: Some("image/jpeg".into()),
            }],
        };
        assert_eq!(
            first_image(response, "p").unwrap(),
            ImageData::Bytes {
                data: b"hi".to_vec(),
                mime_type: "image/jpeg".into()
            }
        );
    }

    #[test]
    fn empty_image_list_is_an_error() {
        let response = TextToImageResponse { images: vec![] };
        assert!(first_image(response, "p").is_err());
    }
}
