use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use counter_logging::{engine_debug, engine_info, engine_warn};
use tokio::sync::Mutex;
use wordcount_core::FrequencyMap;

use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::sink::{AggregationSink, MergeError, SinkError};

/// Totals persisted as a JSON object (`{"word": count, ...}`) in a single file.
///
/// Every merge rewrites the file atomically while holding the store lock, so
/// concurrent merges are applied one after another. If writing the file fails the
/// in-memory totals keep the increments and the merge reports every word as
/// failed; the next successful write persists them.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    file_name: String,
    writer: AtomicFileWriter,
    totals: Mutex<HashMap<String, u64>>,
}

impl JsonFileSink {
    /// Opens the store at `path`, loading existing totals. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| SinkError::Unavailable(format!("not a file path: {path:?}")))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let totals = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_totals(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                engine_info!("No store at {:?}, starting empty", path);
                HashMap::new()
            }
            Err(err) => return Err(SinkError::Io(err)),
        };
        engine_info!("Opened store {:?} with {} words", path, totals.len());

        Ok(Self {
            path,
            file_name,
            writer: AtomicFileWriter::new(dir),
            totals: Mutex::new(totals),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, totals: &HashMap<String, u64>) -> Result<(), SinkError> {
        let sorted: BTreeMap<&str, u64> = totals.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let content = serde_json::to_string_pretty(&sorted)
            .map_err(|err| SinkError::Corrupt(err.to_string()))?;
        let writer = self.writer.clone();
        let file_name = self.file_name.clone();
        tokio::task::spawn_blocking(move || writer.write(&file_name, &content))
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))??;
        engine_debug!("Persisted {} words to {:?}", totals.len(), self.path);
        Ok(())
    }
}

fn parse_totals(content: &str) -> Result<HashMap<String, u64>, SinkError> {
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(content).map_err(|err| SinkError::Corrupt(err.to_string()))
}

#[async_trait]
impl AggregationSink for JsonFileSink {
    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }

    async fn increment(&self, word: &str, count: u64) -> Result<u64, SinkError> {
        let mut totals = self.totals.lock().await;
        let total = {
            let entry = totals.entry(word.to_string()).or_insert(0);
            *entry += count;
            *entry
        };
        self.persist(&totals).await?;
        Ok(total)
    }

    /// Applies the whole map under one lock and writes the file once.
    async fn merge(&self, map: &FrequencyMap) -> Result<(), MergeError> {
        if map.is_empty() {
            return Ok(());
        }
        let mut totals = self.totals.lock().await;
        for (word, count) in map.iter() {
            *totals.entry(word.to_string()).or_insert(0) += count;
        }
        match self.persist(&totals).await {
            Ok(()) => Ok(()),
            Err(err) => {
                engine_warn!("Failed to persist merge to {:?}: {}", self.path, err);
                let message = err.to_string();
                let failures = map
                    .iter()
                    .map(|(word, _)| (word.to_string(), SinkError::Unavailable(message.clone())))
                    .collect();
                Err(MergeError {
                    attempted: map.len(),
                    failures,
                })
            }
        }
    }

    async fn lookup(&self, word: &str) -> Result<u64, SinkError> {
        Ok(self.totals.lock().await.get(word).copied().unwrap_or(0))
    }

    async fn snapshot(&self) -> Result<FrequencyMap, SinkError> {
        let totals = self.totals.lock().await;
        Ok(totals
            .iter()
            .map(|(word, count)| (word.as_str(), *count))
            .collect())
    }

    async fn probe(&self) -> Result<(), SinkError> {
        let _totals = self.totals.lock().await;
        let dir = self.writer.dir().to_path_buf();
        tokio::task::spawn_blocking(move || ensure_output_dir(&dir))
            .await
            .map_err(|err| SinkError::Unavailable(err.to_string()))??;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => parse_totals(&content).map(|_| ()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SinkError::Io(err)),
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        let totals = self.totals.lock().await;
        self.persist(&totals).await?;
        engine_info!("Closed store {:?} with {} words", self.path, totals.len());
        Ok(())
    }
}
