//! Word counter engine: stream consumption, sources, sinks and job execution.
mod consumer;
mod counter;
mod engine;
mod fetch;
mod json_store;
mod persist;
mod sink;
mod source;
mod types;

pub use consumer::{
    consume, consume_with_encoding, ConsumeError, ConsumeState, ConsumeSummary,
};
pub use counter::{PipelineError, ProcessSummary, WordCounter, DEFAULT_CHUNK_SIZE};
pub use engine::{EngineConfig, EngineError, EngineHandle, StoreConfig};
pub use fetch::{
    encoding_for_content_type, FetchSettings, FetchedBody, Fetcher, ReqwestFetcher,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use sink::{AggregationSink, JsonFileSink, MemorySink, MergeError, SinkError};
pub use source::{file_source, string_source, with_cancellation, ByteStream};
pub use types::{
    ChannelProgressSink, EngineEvent, FailureKind, FetchMetadata, JobId, JobProgress, NoProgress,
    ProgressSink, SourceError, Stage,
};
