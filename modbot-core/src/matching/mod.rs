pub mod cache;
pub mod pattern;
pub mod phrase;
pub mod sentence;

pub use cache::CompiledPatternCache;
pub use pattern::{CompiledPattern, MatchStrategy};
pub use phrase::{Comparison, any_sentence_matches_any, contains_words_in_order};
pub use sentence::split_sentences;
