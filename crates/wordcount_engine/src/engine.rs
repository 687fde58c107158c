use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use counter_logging::{engine_error, engine_info};
use wordcount_core::CountRequest;

use crate::counter::{WordCounter, DEFAULT_CHUNK_SIZE};
use crate::fetch::{FetchSettings, ReqwestFetcher};
use crate::sink::{AggregationSink, JsonFileSink, MemorySink, SinkError};
use crate::types::ChannelProgressSink;
use crate::{EngineEvent, JobId, JobProgress, ProgressSink, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    JsonFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub fetch: FetchSettings,
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::Memory,
            fetch: FetchSettings::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to open store: {0}")]
    Store(#[from] SinkError),
}

enum EngineCommand {
    Enqueue { job_id: JobId, request: CountRequest },
    Lookup { word: String },
    Top { n: usize },
    Health,
    Shutdown,
}

/// Runs count jobs on a background runtime; all jobs share one sink.
///
/// Jobs run concurrently. Results and progress arrive as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Builds the runtime, opens the configured store and starts the engine thread.
    pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let sink: Arc<dyn AggregationSink> = match &config.store {
            StoreConfig::Memory => Arc::new(MemorySink::new()),
            StoreConfig::JsonFile(path) => {
                Arc::new(runtime.block_on(JsonFileSink::open(path.clone()))?)
            }
        };
        let fetcher = Arc::new(ReqwestFetcher::new(config.fetch));
        let counter = WordCounter::new(sink, fetcher).with_chunk_size(config.chunk_size);
        Ok(Self::with_counter(runtime, counter))
    }

    /// Starts the engine thread around an already constructed counter.
    pub fn with_counter(runtime: tokio::runtime::Runtime, counter: WordCounter) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let counter = Arc::new(counter);

        let thread = thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                if let EngineCommand::Shutdown = command {
                    if let Err(err) = runtime.block_on(counter.close()) {
                        engine_error!("Failed to close store: {}", err);
                    }
                    break;
                }
                let counter = counter.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(counter.as_ref(), command, event_tx).await;
                });
            }
            engine_info!("Engine stopped");
            let _ = event_tx.send(EngineEvent::Stopped);
        });

        Self {
            cmd_tx,
            event_rx,
            thread: Some(thread),
        }
    }

    pub fn enqueue(&self, job_id: JobId, request: CountRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Enqueue { job_id, request });
    }

    pub fn lookup(&self, word: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Lookup { word: word.into() });
    }

    pub fn top(&self, n: usize) {
        let _ = self.cmd_tx.send(EngineCommand::Top { n });
    }

    pub fn health(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Health);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits for the next event; `None` once the engine has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Closes the store and stops the engine thread.
    ///
    /// Jobs still running are abandoned; wait for their completion events first.
    pub fn shutdown(mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn handle_command(
    counter: &WordCounter,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Enqueue { job_id, request } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            sink.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Queued)));
            let outcome = counter.count(job_id, &request, &sink).await;
            sink.emit(EngineEvent::Progress(JobProgress::stage(job_id, Stage::Done)));
            let _ = event_tx.send(EngineEvent::JobCompleted { job_id, outcome });
        }
        EngineCommand::Lookup { word } => {
            let result = counter
                .word_statistics(&word)
                .await
                .map_err(|err| err.to_string());
            let _ = event_tx.send(EngineEvent::Statistics(result));
        }
        EngineCommand::Top { n } => {
            let result = counter.top(n).await.map_err(|err| err.to_string());
            let _ = event_tx.send(EngineEvent::Top(result));
        }
        EngineCommand::Health => {
            let report = counter.health_check().await;
            let _ = event_tx.send(EngineEvent::Health(report));
        }
        EngineCommand::Shutdown => {}
    }
}
