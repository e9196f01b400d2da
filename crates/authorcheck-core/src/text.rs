//! Text normalization shared by training and serving
//!
//! The same function runs over every dataset row before fitting and over every
//! request body before prediction, so both sides see one feature space.

/// Characters removed before punctuation filtering
const STRIPPED_TAGS: [char; 2] = ['\n', '\''];

/// Normalize text: strip newlines and apostrophes, drop ASCII punctuation, lowercase.
///
/// Total over any input; `normalize("")` is `""` and the function is idempotent.
pub fn normalize(text: &str) -> String {
    let filtered: String = text
        .chars()
        .filter(|c| !STRIPPED_TAGS.contains(c) && !c.is_ascii_punctuation())
        .collect();
    filtered.to_lowercase()
}

/// Whether a normalized text has any content left
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
