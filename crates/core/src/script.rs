//! Script parsing: raw story text -> ordered scenes.
//!
//! # Scene boundary convention
//!
//! - A line holding only a marker starts a new scene. Markers are
//!   `Scene N`, `Scene N:`, `SCENE N -`, `[Scene N]`, `Page N` (case
//!   insensitive, number optional) and horizontal rules of three or more
//!   `-`, `*` or `=`.
//! - A marker followed by text (`Scene 2: Leo runs home`) starts a new
//!   scene whose first line is that text.
//! - A blank line also ends the current scene.
//! - Blocks that are empty after trimming are dropped and consume no scene
//!   number. Numbers written in markers are ignored: scenes are always
//!   numbered 1, 2, 3... in parse order.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::error::CoreError;
use crate::location::extract_location;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum script length in characters.
pub const MAX_SCRIPT_LENGTH: usize = 50_000;

/// Maximum number of scenes generated for one script.
pub const MAX_SCENES: usize = 50;

/// Numbered markers accept any separator (`Scene 2:Leo`); unnumbered ones
/// need whitespace after it so that `Scene-stealing Leo` stays story text.
static SCENE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^\s*\[?\s*(?:scene|page)(?:",
        r"\s*#?\s*\d+\s*\]?\s*(?:[:.)\-–—]\s*(.*))?",
        r"|",
        r"\s*\]?\s*(?:[:.)\-–—](?:\s+(.*))?)?",
        r")$",
    ))
    .expect("valid regex")
});

static RULE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:-{3,}|\*{3,}|={3,})\s*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One unit of the story script. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    /// 1-based position in parse order.
    pub scene_number: u32,
    pub description: String,
    /// Roster names mentioned in the description, in roster order.
    pub character_names: Vec<String>,
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate raw script text before parsing.
pub fn validate_script(script: &str) -> Result<(), CoreError> {
    if script.trim().is_empty() {
        return Err(CoreError::Validation("No script provided".to_string()));
    }
    let len = script.chars().count();
    if len > MAX_SCRIPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Script exceeds maximum length of {MAX_SCRIPT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

/// Validate the parsed scene list: at least one and at most [`MAX_SCENES`].
pub fn validate_scenes(scenes: &[Scene]) -> Result<(), CoreError> {
    if scenes.is_empty() {
        return Err(CoreError::Validation("No valid scenes found".to_string()));
    }
    if scenes.len() > MAX_SCENES {
        return Err(CoreError::Validation(format!(
            "Script has too many scenes: at most {MAX_SCENES} allowed (got {})",
            scenes.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split a script into trimmed, non-empty scene blocks.
///
/// Lines inside a block are joined with single spaces.
pub fn split_scene_blocks(script: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    fn flush<'a>(current: &mut Vec<&'a str>, blocks: &mut Vec<String>) {
        let text = current.join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            blocks.push(text);
        }
        current.clear();
    }

    for line in script.lines() {
        if line.trim().is_empty() || RULE_MARKER_RE.is_match(line) {
            flush(&mut current, &mut blocks);
            continue;
        }
        if let Some(caps) = SCENE_MARKER_RE.captures(line) {
            flush(&mut current, &mut blocks);
            let rest = caps.get(1).or_else(|| caps.get(2));
            if let Some(rest) = rest.map(|m| m.as_str().trim()) {
                if !rest.is_empty() {
                    current.push(rest);
                }
            }
            continue;
        }
        current.push(line.trim());
    }
    flush(&mut current, &mut blocks);

    blocks
}

/// Return the roster names mentioned in `text` as whole words,
/// case-insensitively, in roster order.
pub fn detect_character_names(text: &str, roster: &[Character]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for character in roster {
        let name = character.name.trim();
        if name.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }
        if mentions_name(text, name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Parse a script into scenes. Returns an empty list when the script holds
/// no content; callers must treat that as a validation error.
pub fn parse_script(script: &str, roster: &[Character]) -> Vec<Scene> {
    split_scene_blocks(script)
        .into_iter()
        .enumerate()
        .map(|(idx, description)| Scene {
            id: uuid::Uuid::new_v4().to_string(),
            scene_number: idx as u32 + 1,
            character_names: detect_character_names(&description, roster),
            location: extract_location(&description),
            description,
        })
        .collect()
}

fn mentions_name(text: &str, name: &str) -> bool {
    // `\b` fails for names that start or end with punctuation ("Dr. Bo"),
    // so the boundary is spelled out as "not a word character".
    let pattern = format!(
        r"(?i)(?:^|[^\p{{L}}\p{{N}}_]){}(?:$|[^\p{{L}}\p{{N}}_])",
        regex::escape(name)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => text.to_lowercase().contains(&name.to_lowercase()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
