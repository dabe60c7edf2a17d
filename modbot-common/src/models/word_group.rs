use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Ordered list of word-group strings, e.g. `["play game|subnautica me"]`.
///
/// Each element is a space-separated sequence of groups and each group may list
/// `|`-separated alternatives. Equality and hashing go by the exact ordered
/// strings, which makes the filter usable as a cache key. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct WordGroupFilter(Arc<[String]>);

impl WordGroupFilter {
    pub fn new<I, S>(word_groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(word_groups.into_iter().map(Into::into).collect())
    }

    pub fn word_groups(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<String>> for WordGroupFilter {
    fn from(v: Vec<String>) -> Self {
        Self(v.into())
    }
}

impl From<WordGroupFilter> for Vec<String> {
    fn from(f: WordGroupFilter) -> Self {
        f.0.to_vec()
    }
}

impl fmt::Display for WordGroupFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
