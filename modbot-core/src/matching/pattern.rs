// File: modbot-core/src/matching/pattern.rs

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};

use modbot_common::error::Error;
use modbot_common::models::WordGroupFilter;

use crate::matching::phrase::{PUNCTUATION_RANGES, any_sentence_matches_any};
use crate::matching::sentence::SENTENCE_BOUNDARIES;

/// Upper bound on phrasings one word-group string may expand to under
/// [`MatchStrategy::SentenceOrder`].
pub const MAX_PHRASINGS: usize = 256;

/// Which matcher word-group filters are compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Sentence splitting plus ordered whole-word search.
    #[default]
    SentenceOrder,
    /// One regular expression per word-group string.
    Regex,
}

impl FromStr for MatchStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentence" | "sentence_order" => Ok(MatchStrategy::SentenceOrder),
            "regex" => Ok(MatchStrategy::Regex),
            other => Err(Error::Config(format!(
                "unknown match strategy `{other}` (expected `sentence` or `regex`)"
            ))),
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::SentenceOrder => f.write_str("sentence"),
            MatchStrategy::Regex => f.write_str("regex"),
        }
    }
}

/// Executable form of one word-group string.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Every concrete phrasing the alternatives allow, e.g. `"play game me"` and
    /// `"play subnautica me"` for `"play game|subnautica me"`.
    SentenceOrder(Vec<String>),
    Regex(Regex),
}

impl CompiledPattern {
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            CompiledPattern::SentenceOrder(phrasings) => any_sentence_matches_any(text, phrasings),
            CompiledPattern::Regex(re) => re.is_match(text),
        }
    }
}

/// Splits one word-group string into its ordered groups and each group into its
/// alternatives, rejecting anything but `|`-separated letters and digits.
pub fn parse_word_groups(word_groups: &str) -> Result<Vec<Vec<&str>>, Error> {
    let groups: Vec<Vec<&str>> = word_groups
        .split(' ')
        .filter(|g| !g.is_empty())
        .map(|group| {
            let alternatives: Vec<&str> = group.split('|').collect();
            let valid = alternatives
                .iter()
                .all(|alt| !alt.is_empty() && alt.chars().all(|c| c.is_ascii_alphanumeric()));
            if valid {
                Ok(alternatives)
            } else {
                Err(Error::InvalidWordGroup {
                    word_groups: word_groups.to_string(),
                    group: group.to_string(),
                })
            }
        })
        .collect::<Result<_, _>>()?;

    if groups.is_empty() {
        return Err(Error::EmptyWordGroup(word_groups.to_string()));
    }
    Ok(groups)
}

/// Builds the case-insensitive regex requiring every group in order, with only
/// non sentence-terminating characters between consecutive groups. Word edges
/// are the same whitespace and punctuation the sentence matcher uses, so `_`
/// separates words and `$`, `+` or `<` do not.
pub fn compile_regex(word_groups: &str) -> Result<Regex, Error> {
    let groups = parse_word_groups(word_groups)?;
    let terminators = class_items(SENTENCE_BOUNDARIES.iter().map(|&c| (c, c)));
    let punctuation = class_items(PUNCTUATION_RANGES.iter().copied());

    let edge = format!(r"[\s{punctuation}{terminators}]");
    let separator = format!(r"[[\s{punctuation}]--[{terminators}]]");
    let gap = format!("{separator}(?:[^{terminators}]*?{separator})?");
    let body = groups
        .iter()
        .map(|alternatives| format!("(?:{})", alternatives.join("|")))
        .collect::<Vec<_>>()
        .join(&gap);
    let source = format!("(?:^|{edge}){body}(?:$|{edge})");

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .map_err(|e| Error::InvalidDefinition(format!("word groups `{word_groups}`: {e}")))
}

/// Character class body for inclusive `ranges`, every char hex-escaped.
fn class_items(ranges: impl Iterator<Item = (char, char)>) -> String {
    ranges
        .map(|(lo, hi)| {
            if lo == hi {
                format!(r"\x{{{:X}}}", u32::from(lo))
            } else {
                format!(r"\x{{{:X}}}-\x{{{:X}}}", u32::from(lo), u32::from(hi))
            }
        })
        .collect()
}

/// Expands alternatives into every concrete phrasing, in definition order.
pub fn expand_phrasings(word_groups: &str) -> Result<Vec<String>, Error> {
    let groups = parse_word_groups(word_groups)?;
    let total = groups
        .iter()
        .try_fold(1usize, |acc, alts| acc.checked_mul(alts.len()))
        .filter(|n| *n <= MAX_PHRASINGS);
    if total.is_none() {
        return Err(Error::InvalidDefinition(format!(
            "word groups `{word_groups}` expand to more than {MAX_PHRASINGS} phrasings"
        )));
    }

    let mut phrasings = vec![String::new()];
    for alternatives in &groups {
        phrasings = phrasings
            .iter()
            .flat_map(|prefix| {
                alternatives.iter().map(move |alt| {
                    if prefix.is_empty() {
                        (*alt).to_string()
                    } else {
                        format!("{prefix} {alt}")
                    }
                })
            })
            .collect();
    }
    Ok(phrasings)
}

/// Compiles every string of `filter`, in order. Fails on the first invalid
/// string; a filter without strings is an [`Error::EmptyWordGroup`].
pub fn compile(filter: &WordGroupFilter, strategy: MatchStrategy) -> Result<Vec<CompiledPattern>, Error> {
    if filter.is_empty() {
        return Err(Error::EmptyWordGroup(filter.to_string()));
    }
    filter
        .word_groups()
        .iter()
        .map(|groups| match strategy {
            MatchStrategy::SentenceOrder => expand_phrasings(groups).map(CompiledPattern::SentenceOrder),
            MatchStrategy::Regex => compile_regex(groups).map(CompiledPattern::Regex),
        })
        .collect()
}

/// Checks a filter for definition errors without keeping the result.
pub fn validate(filter: &WordGroupFilter) -> Result<(), Error> {
    compile(filter, MatchStrategy::Regex).map(|_| ())
}
