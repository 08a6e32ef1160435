//! Batch orchestration.
//!
//! [`BatchProcessor`] turns one dropped batch of files into a
//! [`BatchOutcome`]: each eligible file is read and parsed in its own tokio
//! task, the tasks are awaited in drop order, and their rows are folded into
//! a batch-local accumulator one file at a time. Only a small window of
//! files is read ahead of the fold. [`BatchOrchestrator`] wraps
//! a processor in a background task fed by a queue, so batches dropped while
//! another is still processing run afterwards, in submission order.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tally_core::error::{Result, TallyError};
use tally_core::models::{CategoryTotals, Row};
use tally_core::settings::DEFAULT_EXTENSION;
use tally_data::aggregator::{aggregate_with_stats, AggregateStats};
use tally_data::reader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

/// Files read and parsed ahead of the fold within one batch.
pub const MAX_FILES_IN_FLIGHT: usize = 8;

// ── Public types ──────────────────────────────────────────────────────────────

/// Whether a batch is currently being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Processing,
}

/// Parsing options applied to every file of a batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Required file name suffix, compared case-sensitively.
    pub extension: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

/// The result of one batch, handed to the display in a single piece.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Sequence number of the batch, starting at 0.
    pub batch_id: u64,
    /// Per-category sums in first-seen order.
    pub totals: CategoryTotals,
    /// Diagnostics raised while processing, in file order.
    pub diagnostics: Vec<Diagnostic>,
    /// Candidate files after directory expansion.
    pub files_received: usize,
    /// Files that contributed at least one amount.
    pub files_tallied: usize,
    /// Row handling counters summed over every parsed file.
    pub stats: AggregateStats,
}

/// Progress notifications emitted by [`BatchOrchestrator`].
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// A batch left the queue and is now processing. `files` counts the
    /// candidate files after directory expansion, as in
    /// [`BatchOutcome::files_received`].
    Started { batch_id: u64, files: usize },
    /// A batch finished; its outcome replaces the previous one.
    Finished(BatchOutcome),
}

// ── BatchProcessor ────────────────────────────────────────────────────────────

/// Resolves batches one at a time.
pub struct BatchProcessor {
    config: BatchConfig,
    sink: Arc<dyn DiagnosticSink>,
    state: BatchState,
    next_batch_id: u64,
}

impl BatchProcessor {
    pub fn new(config: BatchConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            config,
            sink,
            state: BatchState::Idle,
            next_batch_id: 0,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Id the next non-empty batch will receive.
    pub fn next_batch_id(&self) -> u64 {
        self.next_batch_id
    }

    /// Process one batch from an empty accumulator.
    ///
    /// Returns `None` for an empty drop, which does not start a batch. A
    /// failing file never aborts the batch: it is reported to the sink and
    /// contributes nothing.
    pub async fn process_batch(&mut self, files: Vec<PathBuf>) -> Option<BatchOutcome> {
        if files.is_empty() {
            tracing::debug!("empty drop ignored");
            return None;
        }
        let files = expand_dropped(files).await;
        Some(self.process_expanded(files).await)
    }

    /// Process candidate files that have already been through
    /// [`expand_dropped`].
    ///
    /// At most [`MAX_FILES_IN_FLIGHT`] files are read and parsed ahead of the
    /// fold, which bounds both concurrency and the rows held in memory.
    pub async fn process_expanded(&mut self, files: Vec<PathBuf>) -> BatchOutcome {
        self.state = BatchState::Processing;
        let batch_id = self.next_batch_id;
        self.next_batch_id += 1;

        let files_received = files.len();
        tracing::info!(batch_id, files = files_received, "processing batch");

        let mut totals = CategoryTotals::new();
        let mut diagnostics = Vec::new();
        let mut stats = AggregateStats::default();
        let mut files_tallied = 0usize;

        let mut upcoming = files.into_iter();
        let mut in_flight: VecDeque<(PathBuf, Option<ParseJob>)> = VecDeque::new();

        loop {
            while in_flight.len() < MAX_FILES_IN_FLIGHT {
                let Some(path) = upcoming.next() else { break };
                let job = reader::is_supported_file(&path, &self.config.extension)
                    .then(|| spawn_parse(path.clone(), self.config.delimiter));
                in_flight.push_back((path, job));
            }
            let Some((path, job)) = in_flight.pop_front() else {
                break;
            };

            let parsed = match job {
                None => Err(TallyError::UnsupportedFileType(path.clone())),
                Some(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(TallyError::parse(&path, format!("parse task failed: {e}"))),
                },
            };

            let rows = match parsed {
                Ok(rows) => rows,
                Err(e) => {
                    self.emit(&mut diagnostics, Diagnostic::from_error(&path, &e));
                    continue;
                }
            };

            let (next, file_stats) = aggregate_with_stats(totals, &rows);
            totals = next;
            stats.add(&file_stats);

            tracing::debug!(
                "File {}: {} rows, {} short, {} non-numeric, {} tallied",
                path.display(),
                file_stats.rows_seen,
                file_stats.rows_short,
                file_stats.rows_non_numeric,
                file_stats.rows_contributed,
            );

            if file_stats.rows_contributed == 0 {
                self.emit(&mut diagnostics, Diagnostic::EmptyResult { file: path });
            } else {
                files_tallied += 1;
            }
        }

        self.state = BatchState::Idle;
        tracing::info!(
            batch_id,
            categories = totals.len(),
            diagnostics = diagnostics.len(),
            "batch finished"
        );

        BatchOutcome {
            batch_id,
            totals,
            diagnostics,
            files_received,
            files_tallied,
            stats,
        }
    }

    fn emit(&self, diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
        self.sink.report(&diagnostic);
        diagnostics.push(diagnostic);
    }
}

/// Expand dropped paths into candidate files off the async workers.
///
/// Directory walks block, so they run on the blocking pool. If that task
/// fails the dropped paths are used unexpanded.
pub async fn expand_dropped(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let dropped = files.clone();
    match tokio::task::spawn_blocking(move || reader::expand_inputs(&files)).await {
        Ok(expanded) => expanded,
        Err(e) => {
            tracing::warn!(error = %e, "directory expansion failed; using dropped paths");
            dropped
        }
    }
}

type ParseJob = JoinHandle<Result<Vec<Row>>>;

/// Read one file asynchronously, then parse it on the blocking pool.
fn spawn_parse(path: PathBuf, delimiter: u8) -> ParseJob {
    tokio::spawn(async move {
        let content = tokio::fs::read(&path)
            .await
            .map_err(|source| TallyError::FileRead {
                path: path.clone(),
                source,
            })?;
        let parse_path = path.clone();
        tokio::task::spawn_blocking(move || {
            reader::parse_rows(&content, delimiter).map_err(|e| e.with_path(&parse_path))
        })
        .await
        .unwrap_or_else(|e| Err(TallyError::parse(&path, format!("parse task failed: {e}"))))
    })
}

// ── BatchOrchestrator ─────────────────────────────────────────────────────────

/// Background batch service.
///
/// Call [`BatchOrchestrator::start`] to spawn the service; submit batches
/// through the returned [`BatchSubmitter`] and read [`BatchEvent`]s from the
/// receiver.
pub struct BatchOrchestrator {
    processor: BatchProcessor,
}

impl BatchOrchestrator {
    pub fn new(config: BatchConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            processor: BatchProcessor::new(config, sink),
        }
    }

    /// Spawn the service loop.
    ///
    /// Batches are queued without bound and processed strictly one after
    /// another. The loop ends when every submitter is dropped or the event
    /// receiver is closed.
    pub fn start(self) -> (BatchSubmitter, mpsc::Receiver<BatchEvent>, BatchHandle) {
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(16);

        let handle = tokio::spawn(async move {
            self.run(batch_rx, event_tx).await;
        });

        (
            BatchSubmitter { tx: batch_tx },
            event_rx,
            BatchHandle { handle },
        )
    }

    async fn run(
        mut self,
        mut batch_rx: mpsc::UnboundedReceiver<Vec<PathBuf>>,
        event_tx: mpsc::Sender<BatchEvent>,
    ) {
        while let Some(files) = batch_rx.recv().await {
            if files.is_empty() {
                continue;
            }
            let files = expand_dropped(files).await;

            let started = BatchEvent::Started {
                batch_id: self.processor.next_batch_id(),
                files: files.len(),
            };
            if event_tx.send(started).await.is_err() {
                break;
            }

            let outcome = self.processor.process_expanded(files).await;

            if let Err(e) = event_tx.send(BatchEvent::Finished(outcome)).await {
                tracing::warn!(error = %e, "failed to send batch outcome; receiver dropped");
                break;
            }
        }

        tracing::debug!("batch queue closed; exiting loop");
    }
}

/// Cloneable handle for queueing batches.
#[derive(Debug, Clone)]
pub struct BatchSubmitter {
    tx: mpsc::UnboundedSender<Vec<PathBuf>>,
}

impl BatchSubmitter {
    /// Queue a batch. Returns `false` when the service has stopped.
    pub fn submit(&self, files: Vec<PathBuf>) -> bool {
        self.tx.send(files).is_ok()
    }
}

/// A handle to the background batch task.
pub struct BatchHandle {
    handle: JoinHandle<()>,
}

impl BatchHandle {
    /// Immediately abort the service loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
