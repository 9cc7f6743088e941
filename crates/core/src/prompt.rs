//! Prompt composition.
//!
//! The orchestrator composes the scene part of a prompt
//! (`{scene description} {canonical setting} {negative constraints}`) and
//! the style directives; image backends add character context with
//! [`render_prompt`] and report the exact text they sent.

use serde::{Deserialize, Serialize};

use crate::character::CharacterDescriptor;
use crate::error::CoreError;
use crate::subject::GenerationStrategy;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Art style used when the request does not name one.
pub const DEFAULT_ART_STYLE: &str =
    "children's storybook illustration, soft colors, warm lighting, friendly expressions";

/// Maximum length of a user-supplied art style in characters.
pub const MAX_ART_STYLE_LENGTH: usize = 300;

/// Explicit constraints against spurious text and extra characters.
pub const NEGATIVE_CONSTRAINTS: &str = "Do not include any text, letters, captions, speech bubbles, watermarks or signatures. Do not add any characters other than the ones described.";

// ---------------------------------------------------------------------------
// Style variants
// ---------------------------------------------------------------------------

/// The two stylistic variants offered by reference-image backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleVariant {
    /// Rounded, volumetric, 3D-animated look.
    Volumetric,
    /// Flat, classic 2D storybook look.
    Flat,
}

impl StyleVariant {
    /// Both variants, in the order previews return them.
    pub const ALL: [StyleVariant; 2] = [StyleVariant::Volumetric, StyleVariant::Flat];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volumetric => "volumetric",
            Self::Flat => "flat",
        }
    }

    pub fn directives(self) -> &'static str {
        match self {
            Self::Volumetric => "Rendered in a rounded, volumetric 3D animated-film style with soft shading and expressive proportions.",
            Self::Flat => "Rendered in a flat, classic 2D storybook style with clean outlines and gentle watercolor textures.",
        }
    }
}

impl std::fmt::Display for StyleVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Validate a user-supplied art style.
pub fn validate_art_style(style: &str) -> Result<(), CoreError> {
    let len = style.chars().count();
    if len > MAX_ART_STYLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Art style exceeds maximum length of {MAX_ART_STYLE_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Style directives for a batch: the requested art style, or `default`.
pub fn style_directives(art_style: Option<&str>, default: &str) -> String {
    let style = art_style
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default);
    format!("Art style: {style}.")
}

/// Compose the scene part of a prompt.
pub fn compose_scene_text(description: &str, setting: Option<&str>) -> String {
    let mut parts = vec![format!("Scene: {}", description.trim())];
    if let Some(setting) = setting {
        parts.push(setting.to_string());
    }
    parts.push(NEGATIVE_CONSTRAINTS.to_string());
    parts.join("\n")
}

/// Render the full text prompt sent to a backend.
///
/// Layout: style directives, optional variant directives, strategy note,
/// scene text, then one line per character.
pub fn render_prompt(
    style_directives: &str,
    variant: Option<StyleVariant>,
    strategy: Option<GenerationStrategy>,
    scene_text: &str,
    characters: &[CharacterDescriptor],
) -> String {
    let mut sections = vec![style_directives.trim().to_string()];
    if let Some(variant) = variant {
        sections.push(variant.directives().to_string());
    }
    match strategy {
        Some(GenerationStrategy::HumanFocused) => sections.push(
            "Keep each person's facial features, skin tone and hairstyle faithful to their reference."
                .to_string(),
        ),
        Some(GenerationStrategy::Flexible) => sections.push(
            "Stylize the subject freely while keeping its defining shapes and colors.".to_string(),
        ),
        None => {}
    }
    sections.push(scene_text.trim().to_string());
    if !characters.is_empty() {
        let lines: Vec<String> = characters
            .iter()
            .map(|c| format!("- {}", c.summary()))
            .collect();
        sections.push(format!("Characters:\n{}", lines.join("\n")));
    }
    sections.join("\n\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterDescription;

    #[test]
    fn style_directives_fall_back_to_default() {
        assert_eq!(style_directives(None, "watercolor"), "Art style: watercolor.");
        assert_eq!(style_directives(Some("  "), "watercolor"), "Art style: watercolor.");
        assert_eq!(style_directives(Some("anime"), "watercolor"), "Art style: anime.");
    }

    #[test]
    fn scene_text_includes_setting_and_negatives_in_order() {
        let text = compose_scene_text(" Mia digs. ", Some("Setting: the beach."));
        assert_eq!(
            text,
            format!("Scene: Mia digs.\nSetting: the beach.\n{NEGATIVE_CONSTRAINTS}")
        );
    }

    #[test]
    fn scene_text_without_setting() {
        let text = compose_scene_text("Mia digs.", None);
        assert_eq!(text, format!("Scene: Mia digs.\n{NEGATIVE_CONSTRAINTS}"));
    }

    #[test]
    fn render_prompt_lists_characters() {
        let characters = vec![CharacterDescriptor {
            id: "c1".into(),
            name: "Mia".into(),
            reference_image_url: None,
            description: CharacterDescription {
                age: Some("7".into()),
                ..Default::default()
            },
        }];
        let prompt = render_prompt(
            "Art style: x.",
            Some(StyleVariant::Flat),
            None,
            "Scene: y",
            &characters,
        );
        assert!(prompt.starts_with("Art style: x.\n\nRendered in a flat"));
        assert!(prompt.ends_with("Characters:\n- Mia (age 7)"));
    }

    #[test]
    fn rejects_overlong_art_style() {
        let style = "a".repeat(MAX_ART_STYLE_LENGTH + 1);
        assert!(validate_art_style(&style).is_err());
    }
}
