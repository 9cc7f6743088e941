#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use storyme_core::logging::LogPolicy;
use storyme_core::subject::KeywordTables;
use storyme_pipeline::orchestrator::GenerationPipeline;
use storyme_pipeline::storage::LocalImageStore;
use storyme_providers::config::ProviderConfig;
use storyme_providers::error::ProviderError;
use storyme_providers::provider::{
    GenerationOutput, GenerationRequest, ImageData, ImageProvider, ProviderKind,
};
use storyme_providers::registry::ProviderRegistry;
use tower::ServiceExt;
use url::Url;

use storyme_api::auth::jwt::{generate_access_token, JwtConfig};
use storyme_api::config::ServerConfig;
use storyme_api::router::build_app_router;
use storyme_api::state::AppState;

pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// A script with two scenes at the same location.
pub const TWO_SCENES: &str =
    "Mia builds a sandcastle at the beach.\n\nLeo finds a shell at the beach.";

/// Backend double: succeeds with a hosted URL (or raw bytes) unless the
/// scene text contains `fail_on`. Scenes containing the `delay_on` trigger
/// answer after the given pause.
pub struct StubProvider {
    pub kind: ProviderKind,
    pub available: bool,
    pub bytes: bool,
    pub fail_on: Option<String>,
    pub delay_on: Option<(String, Duration)>,
}

impl StubProvider {
    pub fn ok(kind: ProviderKind) -> Self {
        Self {
            kind,
            available: true,
            bytes: false,
            fail_on: None,
            delay_on: None,
        }
    }

    pub fn unavailable(kind: ProviderKind) -> Self {
        Self {
            available: false,
            ..Self::ok(kind)
        }
    }

    pub fn failing_on(kind: ProviderKind, trigger: &str) -> Self {
        Self {
            fail_on: Some(trigger.to_string()),
            ..Self::ok(kind)
        }
    }

    pub fn slow_on(kind: ProviderKind, trigger: &str, pause: Duration) -> Self {
        Self {
            delay_on: Some((trigger.to_string(), pause)),
            ..Self::ok(kind)
        }
    }

    pub fn returning_bytes(kind: ProviderKind) -> Self {
        Self {
            bytes: true,
            ..Self::ok(kind)
        }
    }
}

#[async_trait]
impl ImageProvider for StubProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, ProviderError> {
        if let Some(trigger) = &self.fail_on {
            if request.scene_text.contains(trigger.as_str()) {
                return Err(ProviderError::provider("stub", "upstream exploded"));
            }
        }
        if let Some((trigger, pause)) = &self.delay_on {
            if request.scene_text.contains(trigger.as_str()) {
                tokio::time::sleep(*pause).await;
            }
        }
        let image = if self.bytes {
            ImageData::Bytes {
                data: b"fake-png".to_vec(),
                mime_type: "image/png".into(),
            }
        } else {
            ImageData::Url("https://img.test/scene.png".into())
        };
        Ok(GenerationOutput {
            image,
            prompt_used: format!("{}\n{}", request.style_directives, request.scene_text),
            generation_time_secs: 0.25,
        })
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret-long-enough".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults and no provider
/// credentials.
pub fn test_config(storage_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![TEST_ORIGIN.to_string()],
        request_timeout_secs: 30,
        jwt: jwt_config(),
        public_base_url: Url::parse("http://localhost:3000").unwrap(),
        storage_dir: storage_dir.to_path_buf(),
        log_mode: LogPolicy::Development,
        scene_timeout_secs: 5,
        default_art_style: "children's book watercolor".to_string(),
        subject_keywords_path: None,
        providers: ProviderConfig::default(),
    }
}

/// Build the full application router over the given backends, using the
/// same middleware stack as `main.rs`.
pub fn build_test_app(providers: Vec<StubProvider>, storage_dir: &Path) -> Router {
    build_test_app_with_config(providers, test_config(storage_dir))
}

pub fn build_test_app_with_config(providers: Vec<StubProvider>, config: ServerConfig) -> Router {
    let providers: Vec<Arc<dyn ImageProvider>> = providers
        .into_iter()
        .map(|p| Arc::new(p) as Arc<dyn ImageProvider>)
        .collect();
    let registry = ProviderRegistry::new(providers, None, true);
    let store = LocalImageStore::new(config.storage_dir.clone(), config.public_base_url.clone());
    let pipeline = GenerationPipeline::new(
        Arc::new(registry),
        Arc::new(store),
        config.pipeline_config(KeywordTables::default()),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        pipeline: Arc::new(pipeline),
    };
    build_app_router(state, &config)
}

/// Signed access token for the given tier.
pub fn token(tier: &str) -> String {
    generate_access_token("user-1", tier, &jwt_config()).unwrap()
}

pub fn character_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": format!("char-{}", name.to_lowercase()),
        "name": name,
        "referenceImageUrl": format!("/uploads/{}.png", name.to_lowercase()),
        "description": { "age": "7", "hairColor": "brown" }
    })
}

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    bearer: Option<&str>,
) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
