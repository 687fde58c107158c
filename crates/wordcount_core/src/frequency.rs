use std::collections::{hash_map, HashMap};

use serde::{Deserialize, Serialize};

use crate::tokenizer::tokenize;

/// Case-insensitive word counts for one piece of text.
///
/// Keys are lowercase words; every stored count is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyMap {
    counts: HashMap<String, u64>,
}

/// Counts every word in `text`, folding case. Empty input gives an empty map.
pub fn map_words(text: &str) -> FrequencyMap {
    let mut map = FrequencyMap::new();
    for token in tokenize(text) {
        map.add(&token.to_ascii_lowercase(), 1);
    }
    map
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` occurrences of `word`. The word is lowercased; zero counts are ignored.
    pub fn add(&mut self, word: &str, count: u64) {
        if count == 0 {
            return;
        }
        let key = word.to_lowercase();
        *self.counts.entry(key).or_insert(0) += count;
    }

    /// Adds every count of `other` into this map.
    pub fn absorb(&mut self, other: &FrequencyMap) {
        for (word, count) in other.iter() {
            *self.counts.entry(word.to_string()).or_insert(0) += count;
        }
    }

    /// Count for `word` (case-insensitive), 0 when absent.
    pub fn get(&self, word: &str) -> u64 {
        self.counts.get(&word.to_lowercase()).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, equal to the number of tokens that produced the map.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(word, count)| (word.as_str(), *count))
    }

    /// Words sorted by descending count, ties broken alphabetically.
    pub fn sorted(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<_> = self
            .counts
            .iter()
            .map(|(word, count)| (word.clone(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }
}

impl IntoIterator for FrequencyMap {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}

impl<'a> FromIterator<(&'a str, u64)> for FrequencyMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, u64)>>(iter: I) -> Self {
        let mut map = FrequencyMap::new();
        for (word, count) in iter {
            map.add(word, count);
        }
        map
    }
}
