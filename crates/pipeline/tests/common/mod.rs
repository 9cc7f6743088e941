#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storyme_core::character::{Character, CharacterDescription};
use storyme_pipeline::orchestrator::{GenerationPipeline, PipelineConfig};
use storyme_pipeline::storage::LocalImageStore;
use storyme_providers::error::ProviderError;
use storyme_providers::provider::{
    GenerationOutput, GenerationRequest, ImageData, ImageProvider, ProviderKind,
};
use storyme_providers::registry::ProviderRegistry;
use url::Url;

/// What the fake backend does when a prompt contains a trigger phrase.
#[derive(Clone)]
pub enum Behavior {
    Fail(ProviderError),
    Hang,
    Delay(Duration),
    Bytes,
}

/// In-memory backend that records every request and answers from a script
/// of trigger phrases. Untriggered requests succeed with a hosted URL.
pub struct ScriptedProvider {
    kind: ProviderKind,
    available: bool,
    rules: Vec<(String, Behavior)>,
    pub calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            available: true,
            rules: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn when(mut self, trigger: &str, behavior: Behavior) -> Self {
        self.rules.push((trigger.to_string(), behavior));
        self
    }

    pub fn recorded(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
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
        self.calls.lock().unwrap().push(request.clone());
        let count = self.calls.lock().unwrap().len();

        let variant = request.variant.map(|v| v.as_str()).unwrap_or("default");
        let rule = self.rules.iter().find(|(trigger, _)| {
            request.scene_text.contains(trigger.as_str()) || trigger == variant
        });

        let image = match rule.map(|(_, b)| b.clone()) {
            Some(Behavior::Fail(err)) => return Err(err),
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                ImageData::Url("https://img.test/late.png".into())
            }
            Some(Behavior::Delay(pause)) => {
                tokio::time::sleep(pause).await;
                ImageData::Url(format!("https://img.test/{count}.png"))
            }
            Some(Behavior::Bytes) => ImageData::Bytes {
                data: b"fake-png".to_vec(),
                mime_type: "image/png".into(),
            },
            None => ImageData::Url(format!("https://img.test/{count}.png")),
        };

        Ok(GenerationOutput {
            image,
            prompt_used: format!("{}\n{}", request.style_directives, request.scene_text),
            generation_time_secs: 0.5,
        })
    }
}

pub fn character(name: &str) -> Character {
    Character {
        id: format!("char-{}", name.to_lowercase()),
        name: name.to_string(),
        reference_image_url: format!("/uploads/{}.png", name.to_lowercase()),
        description: CharacterDescription {
            age: Some("7".into()),
            ..Default::default()
        },
    }
}

pub fn roster() -> Vec<Character> {
    vec![character("Mia"), character("Leo")]
}

pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        public_base_url: Url::parse("http://localhost:3000").unwrap(),
        scene_timeout: Duration::from_millis(200),
        ..PipelineConfig::default()
    }
}

/// Pipeline over the given backends, storing bytes under `storage_dir`.
pub fn pipeline_with(
    providers: Vec<Arc<dyn ImageProvider>>,
    allow_fallback: bool,
    storage_dir: &std::path::Path,
) -> GenerationPipeline {
    pipeline_with_config(providers, allow_fallback, storage_dir, test_config())
}

pub fn pipeline_with_config(
    providers: Vec<Arc<dyn ImageProvider>>,
    allow_fallback: bool,
    storage_dir: &std::path::Path,
    config: PipelineConfig,
) -> GenerationPipeline {
    let registry = ProviderRegistry::new(providers, None, allow_fallback);
    let store = LocalImageStore::new(storage_dir, config.public_base_url.clone());
    GenerationPipeline::new(Arc::new(registry), Arc::new(store), config)
}
