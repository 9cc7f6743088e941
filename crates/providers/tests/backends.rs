//! HTTP contract tests for both image backends against a mock server.

use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use storyme_core::character::{CharacterDescription, CharacterDescriptor};
use storyme_core::prompt::StyleVariant;
use storyme_providers::config::{ReferenceImageConfig, TextPromptConfig};
use storyme_providers::error::ProviderError;
use storyme_providers::provider::{GenerationRequest, ImageData, ImageProvider};
use storyme_providers::reference::ReferenceImageProvider;
use storyme_providers::text_prompt::TextPromptProvider;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(name: &str, reference_image_url: Option<String>) -> CharacterDescriptor {
    CharacterDescriptor {
        id: format!("char-{}", name.to_lowercase()),
        name: name.to_string(),
        reference_image_url,
        description: CharacterDescription {
            hair_color: Some("curly red".into()),
            ..Default::default()
        },
    }
}

fn request(characters: Vec<CharacterDescriptor>) -> GenerationRequest {
    GenerationRequest::new(
        characters,
        "Scene: Mia builds a sandcastle.",
        "Art style: watercolor.",
    )
}

fn text_provider(server: &MockServer) -> TextPromptProvider {
    TextPromptProvider::new(
        TextPromptConfig {
            endpoint: Some(format!("{}/v1/images", server.uri())),
            api_key: Some("text-key".into()),
            model: "flux-pro".into(),
        },
        Duration::from_secs(5),
    )
}

fn reference_provider(server: &MockServer) -> ReferenceImageProvider {
    ReferenceImageProvider::new(
        ReferenceImageConfig {
            base_url: server.uri(),
            api_key: Some("ref-key".into()),
            model: "image-model".into(),
        },
        Duration::from_secs(5),
    )
}

// ---------------------------------------------------------------------------
// Text-prompt backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn text_backend_sends_prompt_and_returns_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images"))
        .and(header("authorization", "Bearer text-key"))
        .and(body_partial_json(json!({ "model": "flux-pro", "width": 1024 })))
        .and(body_string_contains("Mia builds a sandcastle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "images": [{ "url": "https://cdn.example.com/scene-1.png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = text_provider(&server)
        .generate(&request(vec![descriptor("Mia", None)]))
        .await
        .unwrap();

    assert_eq!(
        output.image,
        ImageData::Url("https://cdn.example.com/scene-1.png".into())
    );
    assert!(output.prompt_used.contains("Art style: watercolor."));
    assert!(output.prompt_used.contains("- Mia"));
}

#[tokio::test]
async fn text_backend_maps_429_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_string("too many requests"),
        )
        .mount(&server)
        .await;

    let err = text_provider(&server)
        .generate(&request(vec![]))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ProviderError::RateLimited {
            retry_after_secs: Some(30),
            ..
        }
    );
}

#[tokio::test]
async fn text_backend_server_error_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let err = text_provider(&server)
        .generate(&request(vec![]))
        .await
        .unwrap_err();

    assert_matches!(err, ProviderError::Provider { .. });
    assert!(err.to_string().contains("model crashed"));
}

// ---------------------------------------------------------------------------
// Reference-image backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reference_backend_inlines_photos_and_decodes_image() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uploads/mia.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"photo".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/image-model:generateContent"))
        .and(header("x-goog-api-key", "ref-key"))
        // base64("photo")
        .and(body_string_contains("cGhvdG8="))
        .and(body_string_contains("- Image 1: Mia"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "aW1hZ2U=" } }
            ]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let photo_url = format!("{}/uploads/mia.png", server.uri());
    let req = request(vec![descriptor("Mia", Some(photo_url))]).with_variant(StyleVariant::Flat);
    let output = reference_provider(&server).generate(&req).await.unwrap();

    assert_eq!(
        output.image,
        ImageData::Bytes {
            data: b"image".to_vec(),
            mime_type: "image/png".into()
        }
    );
    assert!(output.prompt_used.contains("flat, classic 2D"));
}

#[tokio::test]
async fn reference_backend_skips_unreachable_photos() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/uploads/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/image-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/jpeg", "data": "aW1hZ2U=" } }
            ]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let photo_url = format!("{}/uploads/missing.png", server.uri());
    let output = reference_provider(&server)
        .generate(&request(vec![descriptor("Leo", Some(photo_url))]))
        .await
        .unwrap();

    assert!(!output.prompt_used.contains("Reference photos"));
    assert_matches!(output.image, ImageData::Bytes { .. });
}

#[tokio::test]
async fn reference_backend_caps_reference_photos() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(b"photo".to_vec()),
        )
        .expect(5)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/image-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "aW1hZ2U=" } }
            ]}}]
        })))
        .mount(&server)
        .await;

    let characters = (0..7)
        .map(|i| descriptor(&format!("Kid{i}"), Some(format!("{}/uploads/{i}.png", server.uri()))))
        .collect();
    let output = reference_provider(&server)
        .generate(&request(characters))
        .await
        .unwrap();

    assert!(output.prompt_used.contains("- Image 5: Kid4"));
    assert!(!output.prompt_used.contains("- Image 6"));
}

#[tokio::test]
async fn reference_backend_quota_body_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "status": "RESOURCE_EXHAUSTED", "message": "Quota exceeded" }
        })))
        .mount(&server)
        .await;

    let err = reference_provider(&server)
        .generate(&request(vec![]))
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn reference_backend_text_reply_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [ { "text": "Sorry, I can't help" } ] } }]
        })))
        .mount(&server)
        .await;

    let err = reference_provider(&server)
        .generate(&request(vec![]))
        .await
        .unwrap_err();

    assert_matches!(err, ProviderError::Provider { .. });
}
