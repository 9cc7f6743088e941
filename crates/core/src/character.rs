//! Character roster types and the character prompt assembler.
//!
//! A roster [`Character`] is what the user entered; a [`CharacterDescriptor`]
//! is the provider-agnostic view handed to image backends, with its
//! reference image rewritten to an absolute URL.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of characters accepted in one roster.
pub const MAX_ROSTER_SIZE: usize = 20;

/// Maximum length of a character name in characters.
pub const MAX_NAME_LENGTH: usize = 100;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Structured appearance notes for a character. Every field is optional
/// free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_tone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clothing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_features: Option<String>,
}

impl CharacterDescription {
    /// Render the non-empty fields as comma separated phrases, in a fixed
    /// order (age, skin tone, hair, clothing, other features).
    pub fn phrases(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(age) = non_blank(&self.age) {
            out.push(format!("age {age}"));
        }
        if let Some(skin) = non_blank(&self.skin_tone) {
            out.push(format!("{skin} skin"));
        }
        if let Some(hair) = non_blank(&self.hair_color) {
            out.push(format!("{hair} hair"));
        }
        if let Some(clothing) = non_blank(&self.clothing) {
            out.push(format!("wearing {clothing}"));
        }
        if let Some(other) = non_blank(&self.other_features) {
            out.push(other.to_string());
        }
        out
    }
}

/// A character as entered by the user. Immutable for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Client-side identifier; a fresh UUID when the client sends none.
    #[serde(default = "generated_id")]
    pub id: String,
    pub name: String,
    /// Absolute or relative URL of the reference photo. May be empty.
    #[serde(default)]
    pub reference_image_url: String,
    #[serde(default)]
    pub description: CharacterDescription,
}

fn generated_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Provider-agnostic character context injected into a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDescriptor {
    pub id: String,
    pub name: String,
    /// Absolute reference image URL, absent when the character has none.
    pub reference_image_url: Option<String>,
    pub description: CharacterDescription,
}

impl CharacterDescriptor {
    /// One-line textual description, e.g.
    /// `Mia (age 7, fair skin, red hair, wearing a yellow raincoat)`.
    pub fn summary(&self) -> String {
        let phrases = self.description.phrases();
        if phrases.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, phrases.join(", "))
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a roster: non-empty, bounded size, names non-blank and unique
/// (case-insensitive).
pub fn validate_roster(roster: &[Character]) -> Result<(), CoreError> {
    if roster.is_empty() {
        return Err(CoreError::Validation("No characters provided".to_string()));
    }
    if roster.len() > MAX_ROSTER_SIZE {
        return Err(CoreError::Validation(format!(
            "Too many characters: at most {MAX_ROSTER_SIZE} allowed (got {})",
            roster.len()
        )));
    }

    let mut seen = HashSet::new();
    for character in roster {
        let name = character.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation(
                "Character name must not be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(CoreError::Validation(format!(
                "Character name exceeds maximum length of {MAX_NAME_LENGTH} characters"
            )));
        }
        if !seen.insert(name.to_lowercase()) {
            return Err(CoreError::Validation(format!(
                "Duplicate character name '{name}'"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// True when at least one roster character has a reference photo that
/// resolves to a usable URL.
pub fn any_reference_photo(roster: &[Character], base: &Url) -> bool {
    roster
        .iter()
        .any(|c| resolve_reference_url(&c.reference_image_url, base).is_some())
}

/// Rewrite a reference image URL to an absolute URL.
///
/// Absolute URLs (any scheme, including `data:`) pass through unchanged;
/// relative ones are joined against `base`. Blank input yields `None`.
pub fn resolve_reference_url(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(absolute) = Url::parse(raw) {
        return Some(absolute.to_string());
    }
    base.join(raw).ok().map(|u| u.to_string())
}

/// Build the descriptor for a single roster character.
pub fn descriptor_for(character: &Character, base: &Url) -> CharacterDescriptor {
    CharacterDescriptor {
        id: character.id.clone(),
        name: character.name.trim().to_string(),
        reference_image_url: resolve_reference_url(&character.reference_image_url, base),
        description: character.description.clone(),
    }
}

/// Resolve a scene's character names into descriptors.
///
/// Names are matched case-insensitively against the roster and returned in
/// the order given. If `names` is empty or nothing resolves, every roster
/// character is used instead, so a non-empty roster never produces an empty
/// result.
pub fn assemble_descriptors(
    roster: &[Character],
    names: &[String],
    base: &Url,
) -> Vec<CharacterDescriptor> {
    let mut resolved: Vec<CharacterDescriptor> = Vec::new();
    for name in names {
        let wanted = name.trim().to_lowercase();
        let found = roster
            .iter()
            .find(|c| c.name.trim().to_lowercase() == wanted);
        if let Some(character) = found {
            if !resolved.iter().any(|d| d.id == character.id) {
                resolved.push(descriptor_for(character, base));
            }
        }
    }

    if resolved.is_empty() {
        return roster.iter().map(|c| descriptor_for(c, base)).collect();
    }
    resolved
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
