//! Durable running totals of word counts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::future::join_all;
use wordcount_core::FrequencyMap;

use crate::persist::PersistError;

pub use crate::json_store::JsonFileSink;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store content is corrupt: {0}")]
    Corrupt(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// A merge where at least one word could not be saved.
///
/// Words not listed in `failures` were applied and stay applied.
#[derive(Debug, thiserror::Error)]
#[error("could not save {} of {attempted} words to the store", .failures.len())]
pub struct MergeError {
    pub attempted: usize,
    pub failures: Vec<(String, SinkError)>,
}

impl MergeError {
    pub fn failed_words(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(word, _)| word.as_str())
    }
}

/// Store of running word totals, shared by any number of concurrent producers.
///
/// Implementations must make `increment` atomic per word: concurrent increments
/// of the same word never lose an update.
#[async_trait]
pub trait AggregationSink: Send + Sync {
    /// Short description used in logs and health reports.
    fn describe(&self) -> String;

    /// Adds `count` to the total of `word`, creating it if absent. Returns the new total.
    async fn increment(&self, word: &str, count: u64) -> Result<u64, SinkError>;

    /// Adds every entry of `map`, updating all words concurrently.
    ///
    /// Not transactional: when some words fail, the others are still applied.
    async fn merge(&self, map: &FrequencyMap) -> Result<(), MergeError> {
        let updates = map.iter().map(|(word, count)| async move {
            self.increment(word, count)
                .await
                .map_err(|err| (word.to_string(), err))
        });
        let failures: Vec<_> = join_all(updates)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MergeError {
                attempted: map.len(),
                failures,
            })
        }
    }

    /// Total for `word`; unknown words have a total of 0.
    async fn lookup(&self, word: &str) -> Result<u64, SinkError>;

    /// All totals, e.g. for reporting the most frequent words.
    async fn snapshot(&self) -> Result<FrequencyMap, SinkError>;

    /// Succeeds when the store is reachable and can be queried.
    async fn probe(&self) -> Result<(), SinkError>;

    /// Flushes pending state. The sink should not be used afterwards.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Totals kept in process memory only.
#[derive(Debug, Default)]
pub struct MemorySink {
    totals: Mutex<HashMap<String, u64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_totals<T>(&self, f: impl FnOnce(&mut HashMap<String, u64>) -> T) -> Result<T, SinkError> {
        let mut totals = self
            .totals
            .lock()
            .map_err(|_| SinkError::Unavailable("memory store lock poisoned".into()))?;
        Ok(f(&mut totals))
    }
}

#[async_trait]
impl AggregationSink for MemorySink {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn increment(&self, word: &str, count: u64) -> Result<u64, SinkError> {
        self.with_totals(|totals| {
            let total = totals.entry(word.to_string()).or_insert(0);
            *total += count;
            *total
        })
    }

    async fn lookup(&self, word: &str) -> Result<u64, SinkError> {
        self.with_totals(|totals| totals.get(word).copied().unwrap_or(0))
    }

    async fn snapshot(&self) -> Result<FrequencyMap, SinkError> {
        self.with_totals(|totals| {
            totals
                .iter()
                .map(|(word, count)| (word.as_str(), *count))
                .collect()
        })
    }

    async fn probe(&self) -> Result<(), SinkError> {
        self.with_totals(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use wordcount_core::map_words;

    use super::*;

    #[tokio::test]
    async fn merge_creates_and_adds() {
        let sink = MemorySink::new();
        sink.merge(&map_words("a b b")).await.unwrap();
        sink.merge(&map_words("b c")).await.unwrap();
        assert_eq!(sink.lookup("a").await.unwrap(), 1);
        assert_eq!(sink.lookup("b").await.unwrap(), 3);
        assert_eq!(sink.lookup("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_word_is_zero() {
        let sink = MemorySink::new();
        assert_eq!(sink.lookup("nothing").await.unwrap(), 0);
        sink.probe().await.unwrap();
    }

    #[tokio::test]
    async fn snapshot_contains_all_totals() {
        let sink = MemorySink::new();
        sink.merge(&map_words("x y y")).await.unwrap();
        let snapshot = sink.snapshot().await.unwrap();
        assert_eq!(snapshot, map_words("y x y"));
    }
}
