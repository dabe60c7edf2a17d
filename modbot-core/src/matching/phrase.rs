//! Ordered whole-word matching over free text.

use crate::matching::sentence::split_sentences;

/// How phrase words are compared against message content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    CaseSensitive,
    /// Unicode simple case folding, independent of any locale.
    #[default]
    IgnoreCase,
}

/// True if every space-separated word of `phrase` occurs in `content` as a whole
/// word, in the same left-to-right order. Other words may sit in between.
///
/// An empty (or whitespace-only) phrase matches anything; empty content matches
/// only an empty phrase.
pub fn contains_words_in_order(content: &str, phrase: &str, comparison: Comparison) -> bool {
    if content.is_empty() {
        return phrase.trim().is_empty();
    }

    let mut words = phrase
        .split(' ')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .peekable();
    if words.peek().is_none() {
        return true;
    }

    let mut cursor = 0;
    let mut previous_start: Option<usize> = None;
    for word in words {
        let mut search_from = cursor;
        loop {
            let Some((start, end)) = find_from(content, word, search_from, comparison) else {
                return false;
            };
            if previous_start.is_some_and(|prev| start <= prev) {
                return false;
            }
            if starts_at_word_boundary(content, start) && ends_at_word_boundary(content, end) {
                previous_start = Some(start);
                cursor = end;
                break;
            }
            // Hit inside a larger word: look for the next occurrence.
            search_from = start + content[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    true
}

/// Splits `text` into sentences and reports whether any sentence satisfies any
/// of `phrases`, tried in order. A phrase never matches across two sentences.
pub fn any_sentence_matches_any<S: AsRef<str>>(text: &str, phrases: &[S]) -> bool {
    any_sentence_matches_any_with(text, phrases, Comparison::default())
}

pub fn any_sentence_matches_any_with<S: AsRef<str>>(
    text: &str,
    phrases: &[S],
    comparison: Comparison,
) -> bool {
    if text.is_empty() || phrases.is_empty() {
        return false;
    }
    split_sentences(text).any(|sentence| {
        phrases
            .iter()
            .any(|phrase| contains_words_in_order(sentence, phrase.as_ref(), comparison))
    })
}

/// Byte range of the first occurrence of `needle` in `haystack` at or after
/// `from`. `from` must sit on a char boundary.
fn find_from(haystack: &str, needle: &str, from: usize, comparison: Comparison) -> Option<(usize, usize)> {
    let tail = haystack.get(from..)?;
    match comparison {
        Comparison::CaseSensitive => tail
            .find(needle)
            .map(|i| (from + i, from + i + needle.len())),
        Comparison::IgnoreCase => tail.char_indices().find_map(|(offset, _)| {
            let start = from + offset;
            match_ignore_case_at(haystack, start, needle).map(|end| (start, end))
        }),
    }
}

/// If `needle` matches `haystack` at `start` ignoring case, the end offset of
/// the match in `haystack`.
fn match_ignore_case_at(haystack: &str, start: usize, needle: &str) -> Option<usize> {
    let mut rest = haystack[start..].char_indices();
    let mut end = start;
    for expected in needle.chars() {
        let (i, actual) = rest.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
        end = start + i + actual.len_utf8();
    }
    Some(end)
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(&b);
    }
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn starts_at_word_boundary(content: &str, start: usize) -> bool {
    content[..start].chars().next_back().is_none_or(is_word_boundary)
}

fn ends_at_word_boundary(content: &str, end: usize) -> bool {
    content[end..].chars().next().is_none_or(is_word_boundary)
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || is_punctuation(c)
}

/// Unicode punctuation (connector, dash, open/close, quote and other
/// punctuation), limited to the blocks chat text realistically contains.
/// Inclusive ranges.
pub(crate) const PUNCTUATION_RANGES: &[(char, char)] = &[
    ('!', '#'),
    ('%', '*'),
    (',', '/'),
    (':', ';'),
    ('?', '@'),
    ('[', ']'),
    ('_', '_'),
    ('{', '{'),
    ('}', '}'),
    ('\u{00A1}', '\u{00A1}'),
    ('\u{00A7}', '\u{00A7}'),
    ('\u{00AB}', '\u{00AB}'),
    ('\u{00B6}', '\u{00B7}'),
    ('\u{00BB}', '\u{00BB}'),
    ('\u{00BF}', '\u{00BF}'),
    ('\u{2010}', '\u{2027}'),
    ('\u{2030}', '\u{2043}'),
    ('\u{2045}', '\u{2051}'),
    ('\u{2053}', '\u{205E}'),
    ('\u{3001}', '\u{3003}'),
    ('\u{3008}', '\u{3011}'),
];

fn is_punctuation(c: char) -> bool {
    PUNCTUATION_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&c))
}
