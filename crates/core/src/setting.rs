//! Scene setting consistency.
//!
//! [`SettingMap::build`] runs once per batch, before any generation call,
//! and produces exactly one setting sentence per distinct location. Every
//! scene at that location gets the same string, byte for byte.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::location::normalize_location;
use crate::script::Scene;

/// Descriptive details for commonly used story locations, keyed by a word
/// that may appear anywhere in the location phrase.
const KNOWN_SETTINGS: &[(&str, &str)] = &[
    ("beach", "a sunny sandy shore with gentle turquoise waves, scattered seashells and a clear blue sky"),
    ("ocean", "wide open sea with rolling blue waves and a bright horizon"),
    ("sea", "wide open sea with rolling blue waves and a bright horizon"),
    ("forest", "a lush green forest with tall trees, dappled sunlight and soft mossy ground"),
    ("woods", "a lush green forest with tall trees, dappled sunlight and soft mossy ground"),
    ("jungle", "a dense tropical jungle with giant leaves, hanging vines and colorful flowers"),
    ("park", "a friendly park with green lawns, leafy trees, winding paths and a wooden bench"),
    ("playground", "a colorful playground with slides, swings and soft wood-chip ground"),
    ("garden", "a blooming garden with flower beds, a small stone path and buzzing bees"),
    ("school", "a bright school building with big windows, a flag pole and a tidy front yard"),
    ("classroom", "a cheerful classroom with small desks, a chalkboard and children's drawings on the walls"),
    ("castle", "a grand stone castle with tall towers, waving banners and a wooden drawbridge"),
    ("house", "a cozy family house with warm lights, a red front door and a small porch"),
    ("home", "a cozy family home with warm lights, soft furniture and family pictures"),
    ("kitchen", "a warm kitchen with wooden cabinets, a round table and sunlight through the window"),
    ("bedroom", "a cozy bedroom with a neatly made bed, toy shelves and a star-patterned rug"),
    ("attic", "a dusty attic with sloped wooden beams, old trunks and a small round window"),
    ("city", "a lively city street with colorful buildings, shop signs and busy sidewalks"),
    ("street", "a lively street with colorful buildings, shop signs and busy sidewalks"),
    ("village", "a small village with cottages, cobblestone lanes and flower boxes"),
    ("farm", "a countryside farm with a red barn, wooden fences and green fields"),
    ("mountain", "tall snow-capped mountains with rocky trails and pine trees"),
    ("lake", "a calm blue lake surrounded by reeds and gentle hills"),
    ("river", "a sparkling river winding between grassy banks and smooth stones"),
    ("cave", "a mysterious cave with glittering rock walls and soft lantern light"),
    ("space", "deep outer space with twinkling stars, distant planets and a glowing nebula"),
    ("spaceship", "the inside of a friendly spaceship with round windows, glowing buttons and star views"),
    ("library", "a quiet library with tall bookshelves, reading nooks and warm lamps"),
    ("zoo", "a sunny zoo with animal enclosures, shady paths and signposts"),
    ("market", "a bustling market with fruit stalls, striped awnings and hanging lanterns"),
    ("island", "a small tropical island with palm trees, white sand and clear water"),
];

/// Instruction appended to every setting sentence.
const CONSISTENCY_CLAUSE: &str =
    "keep the same layout, landmarks, lighting and color palette in every scene at this location";

/// Canonical location -> setting sentence. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingMap {
    settings: BTreeMap<String, String>,
}

impl SettingMap {
    /// Build the map from every scene's location. The first scene at a
    /// location (in scene order) creates its entry; later scenes reuse it.
    pub fn build(scenes: &[Scene]) -> Self {
        let mut settings = BTreeMap::new();
        for scene in scenes {
            let Some(location) = scene.location.as_deref() else {
                continue;
            };
            let key = normalize_location(location);
            if key.is_empty() {
                continue;
            }
            settings
                .entry(key)
                .or_insert_with_key(|key| describe_setting(key));
        }
        Self { settings }
    }

    /// Look up the canonical setting for a location (case-insensitive).
    pub fn get(&self, location: &str) -> Option<&str> {
        self.settings
            .get(&normalize_location(location))
            .map(String::as_str)
    }

    /// Setting text for a scene, if it has a location.
    pub fn for_scene(&self, scene: &Scene) -> Option<&str> {
        scene.location.as_deref().and_then(|loc| self.get(loc))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Iterate over `(location, setting)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Synthesize the setting sentence for a normalized location key.
pub fn describe_setting(location: &str) -> String {
    let details = location
        .split_whitespace()
        .rev()
        .find_map(|word| {
            KNOWN_SETTINGS
                .iter()
                .find(|(known, _)| *known == word)
                .map(|(_, details)| *details)
        });

    match details {
        Some(details) => format!("Setting: the {location}, {details}; {CONSISTENCY_CLAUSE}."),
        None => format!(
            "Setting: the {location}, drawn with distinctive recognizable details; {CONSISTENCY_CLAUSE}."
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
