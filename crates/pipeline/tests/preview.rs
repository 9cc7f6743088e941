mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{pipeline_with, Behavior, ScriptedProvider};
use storyme_core::generation::GenerationStatus;
use storyme_core::prompt::StyleVariant;
use storyme_core::subject::{ClassificationSource, GenerationStrategy, SubjectType};
use storyme_pipeline::orchestrator::PipelineError;
use storyme_pipeline::preview::{PreviewKind, PreviewRequest};
use storyme_providers::error::ProviderError;
use storyme_providers::provider::ProviderKind;

fn dragon_preview() -> PreviewRequest {
    PreviewRequest {
        name: Some("Sparky".into()),
        character_type: Some("friendly dragon".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn renders_both_variants_with_classification() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(ProviderKind::ReferenceImage));
    let pipeline = pipeline_with(vec![provider.clone()], true, dir.path());

    let result = pipeline.generate_preview(&dragon_preview()).await.unwrap();

    assert_eq!(result.subject_type, SubjectType::FantasyCreature);
    assert_eq!(result.classified_by, ClassificationSource::Keyword);
    assert_eq!(result.strategy, GenerationStrategy::Flexible);
    let variants: Vec<StyleVariant> = result.variants.iter().map(|v| v.variant).collect();
    assert_eq!(variants, StyleVariant::ALL.to_vec());
    assert!(result.variants.iter().all(|v| v.is_completed()));

    let calls = provider.recorded();
    assert_eq!(calls.len(), 2);
    assert!(calls
        .iter()
        .all(|c| c.strategy == Some(GenerationStrategy::Flexible)));
}

#[tokio::test]
async fn photo_only_preview_is_human_focused() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(ProviderKind::ReferenceImage));
    let pipeline = pipeline_with(vec![provider.clone()], true, dir.path());

    let request = PreviewRequest {
        name: Some("Mia".into()),
        reference_image_url: Some("/uploads/mia.png".into()),
        ..Default::default()
    };
    let result = pipeline.generate_preview(&request).await.unwrap();

    assert_eq!(result.subject_type, SubjectType::Human);
    assert_eq!(result.strategy, GenerationStrategy::HumanFocused);
    assert_eq!(
        provider.recorded()[0].characters[0]
            .reference_image_url
            .as_deref(),
        Some("http://localhost:3000/uploads/mia.png")
    );
}

#[tokio::test]
async fn one_failed_variant_keeps_the_other() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(ProviderKind::ReferenceImage).when(
        "flat",
        Behavior::Fail(ProviderError::provider("reference-image", "safety filter")),
    ));
    let pipeline = pipeline_with(vec![provider], true, dir.path());

    let result = pipeline.generate_preview(&dragon_preview()).await.unwrap();

    let volumetric = &result.variants[0];
    let flat = &result.variants[1];
    assert_eq!(volumetric.status, GenerationStatus::Completed);
    assert!(volumetric.image_url.is_some());
    assert_eq!(flat.status, GenerationStatus::Failed);
    assert_eq!(
        flat.error.as_deref(),
        Some("reference-image error: safety filter")
    );
}

#[tokio::test]
async fn both_variants_failing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new(ProviderKind::ReferenceImage)
            .when("flat", Behavior::Fail(ProviderError::provider("reference-image", "boom")))
            .when("volumetric", Behavior::Hang),
    );
    let pipeline = pipeline_with(vec![provider], true, dir.path());

    let err = pipeline.generate_preview(&dragon_preview()).await.unwrap_err();

    assert_matches!(err, PipelineError::PreviewFailed(msg) if msg.contains("volumetric") && msg.contains("flat"));
}

#[tokio::test]
async fn byte_previews_are_stored_per_variant() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(ProviderKind::ReferenceImage).when("", Behavior::Bytes));
    let pipeline = pipeline_with(vec![provider], true, dir.path());

    let result = pipeline.generate_preview(&dragon_preview()).await.unwrap();

    let urls: Vec<&str> = result
        .variants
        .iter()
        .filter_map(|v| v.image_url.as_deref())
        .collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("-volumetric.png"));
    assert!(urls[1].ends_with("-flat.png"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn cover_preview_uses_title() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(ProviderKind::TextPrompt));
    let pipeline = pipeline_with(vec![provider.clone()], true, dir.path());

    let request = PreviewRequest {
        kind: PreviewKind::Cover,
        title: Some("Sparky Learns to Fly".into()),
        ..dragon_preview()
    };
    pipeline.generate_preview(&request).await.unwrap();

    assert!(provider.recorded()[0]
        .scene_text
        .contains("\"Sparky Learns to Fly\""));
}
