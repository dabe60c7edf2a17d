//! Sentence segmentation used before ordered-word matching.

/// Characters that end a sentence for matching purposes.
pub const SENTENCE_BOUNDARIES: [char; 6] = ['.', '!', '?', '"', '`', ':'];

pub fn is_sentence_boundary(c: char) -> bool {
    SENTENCE_BOUNDARIES.contains(&c)
}

/// Splits `text` on [`SENTENCE_BOUNDARIES`], yielding trimmed, non-empty
/// sentences in their original order.
pub fn split_sentences(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.split(is_sentence_boundary)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
