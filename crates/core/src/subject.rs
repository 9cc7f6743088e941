//! Subject-type classification for character and cover previews.
//!
//! The classifier picks one of five buckets and, from that, which
//! generation strategy to use downstream. It is a keyword heuristic: the
//! result is always returned to the caller so it can be corrected and sent
//! back as an explicit hint.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What kind of thing a character is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectType {
    Human,
    Animal,
    #[serde(alias = "creature")]
    FantasyCreature,
    Object,
    Scenery,
}

impl SubjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Animal => "animal",
            Self::FantasyCreature => "fantasy-creature",
            Self::Object => "object",
            Self::Scenery => "scenery",
        }
    }

    /// Strategy used to generate images of this subject.
    pub fn strategy(self) -> GenerationStrategy {
        match self {
            Self::Human => GenerationStrategy::HumanFocused,
            _ => GenerationStrategy::Flexible,
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompting strategy selected from the subject type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStrategy {
    /// Preserve facial features and likeness of a real person.
    HumanFocused,
    /// Free-form stylization for animals, creatures, objects and scenery.
    Flexible,
}

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationSource {
    /// The caller supplied the subject type.
    Hint,
    /// A keyword table matched the character-type label.
    Keyword,
    /// Nothing matched; the documented default was used.
    Default,
}

/// Classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub subject_type: SubjectType,
    pub source: ClassificationSource,
    pub strategy: GenerationStrategy,
}

impl Classification {
    fn new(subject_type: SubjectType, source: ClassificationSource) -> Self {
        Self {
            subject_type,
            source,
            strategy: subject_type.strategy(),
        }
    }
}

/// Keyword tables, one per non-human bucket. Loadable from JSON so the
/// classifier can be extended without a rebuild; missing tables keep their
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTables {
    pub creature: Vec<String>,
    pub animal: Vec<String>,
    pub object: Vec<String>,
    pub scenery: Vec<String>,
}

const DEFAULT_CREATURE: &[&str] = &[
    "dragon", "unicorn", "fairy", "monster", "alien", "robot", "goblin", "troll", "elf", "gnome",
    "mermaid", "wizard", "witch", "ghost", "dinosaur", "phoenix", "griffin", "yeti", "creature",
    "pixie", "sprite", "ogre", "giant", "vampire", "zombie",
];

const DEFAULT_ANIMAL: &[&str] = &[
    "dog", "puppy", "cat", "kitten", "bunny", "rabbit", "bear", "lion", "tiger", "elephant",
    "giraffe", "monkey", "fox", "wolf", "owl", "bird", "duck", "fish", "turtle", "horse", "pony",
    "cow", "pig", "sheep", "mouse", "frog", "penguin", "panda", "koala", "squirrel", "deer",
    "hamster", "parrot", "dolphin", "whale", "butterfly", "bee",
];

const DEFAULT_OBJECT: &[&str] = &[
    "toy", "car", "truck", "train", "ball", "teddy", "doll", "book", "hat", "box", "balloon",
    "rocket", "boat", "plane", "kite", "cup", "lamp", "clock", "chair", "blanket",
];

const DEFAULT_SCENERY: &[&str] = &[
    "landscape", "castle", "forest", "beach", "mountain", "city", "house", "garden", "ocean",
    "sky", "village", "island", "lake", "river", "desert", "meadow", "scenery",
];

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            creature: to_owned(DEFAULT_CREATURE),
            animal: to_owned(DEFAULT_ANIMAL),
            object: to_owned(DEFAULT_OBJECT),
            scenery: to_owned(DEFAULT_SCENERY),
        }
    }
}

impl KeywordTables {
    /// Load tables from a JSON file such as
    /// `{ "creature": ["kraken"], "animal": ["axolotl"] }`.
    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "Failed to read keyword tables from {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw)
            .map_err(|e| CoreError::Config(format!("Invalid keyword tables: {e}")))
    }

    /// Tables in classification priority order.
    fn ordered(&self) -> [(SubjectType, &[String]); 4] {
        [
            (SubjectType::FantasyCreature, self.creature.as_slice()),
            (SubjectType::Animal, self.animal.as_slice()),
            (SubjectType::Object, self.object.as_slice()),
            (SubjectType::Scenery, self.scenery.as_slice()),
        ]
    }

    /// Classify a free-text label by keyword. Returns `None` when nothing
    /// matches.
    pub fn match_label(&self, label: &str) -> Option<SubjectType> {
        let words: Vec<String> = label
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        self.ordered().into_iter().find_map(|(subject, keywords)| {
            keywords
                .iter()
                .any(|k| {
                    let k = k.to_lowercase();
                    words.iter().any(|w| *w == k || w.strip_suffix('s') == Some(k.as_str()))
                })
                .then_some(subject)
        })
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify a preview subject.
///
/// 1. An explicit `hint` always wins.
/// 2. Otherwise a non-blank `character_type` label is matched against the
///    keyword tables (creature, animal, object, scenery, in that order);
///    no match defaults to fantasy creature.
/// 3. Otherwise, with only a reference image, the subject is human.
pub fn classify(
    hint: Option<SubjectType>,
    character_type: Option<&str>,
    tables: &KeywordTables,
) -> Classification {
    if let Some(hint) = hint {
        return Classification::new(hint, ClassificationSource::Hint);
    }

    match character_type.map(str::trim).filter(|s| !s.is_empty()) {
        Some(label) => match tables.match_label(label) {
            Some(subject) => Classification::new(subject, ClassificationSource::Keyword),
            None => Classification::new(
                SubjectType::FantasyCreature,
                ClassificationSource::Default,
            ),
        },
        None => Classification::new(SubjectType::Human, ClassificationSource::Default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
