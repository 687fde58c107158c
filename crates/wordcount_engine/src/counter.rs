use std::sync::Arc;

use counter_logging::{engine_error, engine_info, engine_warn};
use encoding_rs::{Encoding, UTF_8};
use wordcount_core::{
    map_words, validate_request, CountOutcome, CountRequest, HealthReport, ValidationErrors,
    WordStatistics, INCORRECT_INPUT,
};

use crate::consumer::{consume_with_encoding, ConsumeError};
use crate::fetch::Fetcher;
use crate::sink::{AggregationSink, MergeError, SinkError};
use crate::source::{file_source, ByteStream};
use crate::{EngineEvent, JobId, JobProgress, ProgressSink, SourceError, Stage};

/// File read size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl From<ConsumeError<MergeError>> for PipelineError {
    fn from(err: ConsumeError<MergeError>) -> Self {
        match err {
            ConsumeError::Source(err) => PipelineError::Source(err),
            ConsumeError::Handler(err) => PipelineError::Merge(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessSummary {
    pub bytes: u64,
    pub segments: usize,
    pub tokens: u64,
}

/// Counts words from strings, files and URLs into a shared aggregation sink.
pub struct WordCounter {
    sink: Arc<dyn AggregationSink>,
    fetcher: Arc<dyn Fetcher>,
    chunk_size: usize,
}

impl WordCounter {
    pub fn new(sink: Arc<dyn AggregationSink>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            sink,
            fetcher,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn sink(&self) -> &Arc<dyn AggregationSink> {
        &self.sink
    }

    /// Validates a raw `(input, kind)` pair, then counts it.
    pub async fn count_words(
        &self,
        job_id: JobId,
        input: Option<&str>,
        kind: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> CountOutcome {
        match validate_request(input, kind) {
            Ok(request) => self.count(job_id, &request, progress).await,
            Err(errors) => CountOutcome::Invalid {
                validation_errors: errors.messages,
            },
        }
    }

    /// Counts a validated request and reports the result without internal detail.
    pub async fn count(
        &self,
        job_id: JobId,
        request: &CountRequest,
        progress: &dyn ProgressSink,
    ) -> CountOutcome {
        match self.process(job_id, request, progress).await {
            Ok(summary) => {
                engine_info!(
                    "Job {} counted {} words from {}",
                    job_id,
                    summary.tokens,
                    request.describe()
                );
                CountOutcome::Success
            }
            Err(PipelineError::Validation(errors)) => {
                engine_warn!("Job {} rejected {}: {}", job_id, request.describe(), errors);
                CountOutcome::Invalid {
                    validation_errors: errors.messages,
                }
            }
            Err(err) => {
                engine_error!("Job {} failed on {}: {}", job_id, request.describe(), err);
                CountOutcome::failed()
            }
        }
    }

    /// Reads the request's source and merges its word counts into the sink.
    ///
    /// Strings are counted in one piece; files and URLs are consumed chunk by
    /// chunk, merging one segment at a time.
    pub async fn process(
        &self,
        job_id: JobId,
        request: &CountRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ProcessSummary, PipelineError> {
        progress.emit(EngineEvent::Progress(JobProgress::stage(
            job_id,
            Stage::Validating,
        )));
        let (source, encoding) = match request {
            CountRequest::Text(text) => return self.process_text(job_id, text, progress).await,
            CountRequest::File(path) => {
                check_file(path).await?;
                (file_source(path, self.chunk_size).await?, UTF_8)
            }
            CountRequest::Url(url) => {
                let fetched = self.fetcher.open(url).await?;
                (fetched.body, fetched.encoding)
            }
        };
        self.process_stream(job_id, source, encoding, progress).await
    }

    async fn process_text(
        &self,
        job_id: JobId,
        text: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ProcessSummary, PipelineError> {
        let map = map_words(text);
        let summary = ProcessSummary {
            bytes: text.len() as u64,
            segments: 1,
            tokens: map.total(),
        };
        progress.emit(EngineEvent::Progress(JobProgress {
            job_id,
            stage: Stage::Counting,
            bytes: Some(summary.bytes),
            segments: Some(1),
            tokens: Some(summary.tokens),
        }));
        self.sink.merge(&map).await?;
        Ok(summary)
    }

    /// Consumes `source`, merging each segment's counts before reading on.
    pub async fn process_stream(
        &self,
        job_id: JobId,
        source: ByteStream,
        encoding: &'static Encoding,
        progress: &dyn ProgressSink,
    ) -> Result<ProcessSummary, PipelineError> {
        progress.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Reading)));
        let mut tokens: u64 = 0;
        let mut segments: usize = 0;

        let consumed = consume_with_encoding(source, encoding, |segment| {
            let map = map_words(&segment);
            tokens += map.total();
            segments += 1;
            progress.emit(EngineEvent::Progress(JobProgress {
                job_id,
                stage: Stage::Counting,
                bytes: None,
                segments: Some(segments),
                tokens: Some(tokens),
            }));
            let sink = Arc::clone(&self.sink);
            async move {
                if map.is_empty() {
                    return Ok(());
                }
                sink.merge(&map).await
            }
        })
        .await?;

        Ok(ProcessSummary {
            bytes: consumed.bytes,
            segments: consumed.segments,
            tokens,
        })
    }

    /// Running total of `word`, matched case-insensitively.
    pub async fn word_statistics(&self, word: &str) -> Result<WordStatistics, SinkError> {
        let word = word.trim().to_lowercase();
        let count = self.sink.lookup(&word).await?;
        Ok(WordStatistics { word, count })
    }

    /// The `n` most frequent words, most frequent first.
    pub async fn top(&self, n: usize) -> Result<Vec<WordStatistics>, SinkError> {
        let snapshot = self.sink.snapshot().await?;
        Ok(snapshot
            .sorted()
            .into_iter()
            .take(n)
            .map(|(word, count)| WordStatistics { word, count })
            .collect())
    }

    pub async fn health_check(&self) -> HealthReport {
        let store = self.sink.describe();
        match self.sink.probe().await {
            Ok(()) => HealthReport {
                healthy: true,
                store,
            },
            Err(err) => {
                engine_error!("Health check failed for {}: {}", store, err);
                HealthReport {
                    healthy: false,
                    store,
                }
            }
        }
    }

    pub async fn close(&self) -> Result<(), SinkError> {
        self.sink.close().await
    }
}

/// Rejects paths that are not readable regular files, without saying which.
async fn check_file(path: &std::path::Path) -> Result<(), ValidationErrors> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ValidationErrors::single(INCORRECT_INPUT)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(ValidationErrors::single(INCORRECT_INPUT))
        }
        Err(err) => {
            engine_warn!("Unable to validate file input {:?}: {}", path, err);
            Err(ValidationErrors::single("Unable to validate input."))
        }
    }
}
