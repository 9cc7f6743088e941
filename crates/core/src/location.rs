//! Location extraction from scene descriptions.
//!
//! A location is the short noun phrase following a spatial preposition and
//! an article, e.g. "at the beach" -> `beach`, "inside a dusty old attic"
//! -> `dusty old attic`. The first acceptable match in text order wins;
//! there is no scoring. Time and manner expressions ("in the morning",
//! "in a hurry") are treated as ambiguous and skipped.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum number of words kept in an extracted location phrase.
pub const MAX_LOCATION_WORDS: usize = 3;

/// Preposition followed by a determiner. The phrase itself is read from the
/// text after the match so that a rejected candidate does not swallow the
/// next preposition.
const LOCATION_PREFIX_PATTERN: &str = r"(?i)\b(?:at|in|inside|into|on|near|outside|by|under|across|through|around|behind|beside)\s+(?:the|a|an|their|his|her|our|my|its)\s+";

static LOCATION_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOCATION_PREFIX_PATTERN).expect("valid regex"));

/// Words that terminate a location phrase.
const STOP_WORDS: &[&str] = &[
    "and", "or", "but", "with", "where", "while", "when", "to", "for", "of", "that", "which",
    "who", "as", "because", "then", "so", "until", "after", "before", "is", "was", "were", "are",
    "from", "at", "in", "on", "near", "by", "under", "into", "again", "together", "all",
];

/// Head words that mark a time, weather or manner phrase rather than a place.
const NON_LOCATION_HEADS: &[&str] = &[
    "morning", "afternoon", "evening", "night", "day", "daytime", "middle", "end", "beginning",
    "meantime", "moment", "distance", "dark", "darkness", "hurry", "mood", "way", "air", "rain",
    "snow", "sun", "sunshine", "wind", "same", "other", "first", "last", "past", "future",
    "time", "while", "bit", "row", "line", "circle", "minute", "second", "hour",
    "week", "year", "summer", "winter", "spring", "autumn", "fall", "dream",
];

/// Extract the location phrase from a scene description.
///
/// Returns a lower-cased, whitespace-normalized phrase of at most
/// [`MAX_LOCATION_WORDS`] words, or `None` when no rule matches.
pub fn extract_location(description: &str) -> Option<String> {
    LOCATION_PREFIX_RE
        .find_iter(description)
        .find_map(|m| clean_phrase(&description[m.end()..]))
}

/// Normalize a location key: trimmed, lower-cased, single-spaced.
pub fn normalize_location(location: &str) -> String {
    location
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read up to [`MAX_LOCATION_WORDS`] words from the start of `rest`,
/// stopping at punctuation, digits or a stop word.
fn clean_phrase(rest: &str) -> Option<String> {
    let mut words: Vec<String> = Vec::new();
    for token in rest.split_whitespace() {
        let word: String = token
            .chars()
            .take_while(|c| c.is_alphabetic() || *c == '\'' || *c == '-')
            .collect();
        let word = word.trim_matches(|c: char| c == '\'' || c == '-').to_lowercase();
        if word.is_empty() || STOP_WORDS.contains(&word.as_str()) {
            break;
        }
        words.push(word);
        // Trailing punctuation ends the phrase after this word.
        let clean_len = token
            .trim_end_matches(|c: char| !(c.is_alphabetic() || c == '\'' || c == '-'))
            .len();
        if words.len() == MAX_LOCATION_WORDS || clean_len < token.len() {
            break;
        }
    }

    let head = words.first()?;
    if NON_LOCATION_HEADS.contains(&head.as_str()) {
        return None;
    }
    Some(words.join(" "))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
