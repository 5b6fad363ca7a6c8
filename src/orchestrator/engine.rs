//! Retry-and-playlist download orchestration
//!
//! One `Run` per submitted request: probe, optionally wait for a playlist
//! selection, then fetch the chosen items strictly one after another with a
//! fixed-delay retry per item. Everything the caller sees goes out as a
//! `RunEvent` on the run's channel.

use crate::extractor::{Extractor, FetchOptions, ItemRef, MediaKind, Metadata};
use crate::history::{HistoryEntry, HistoryStore};
use crate::orchestrator::handle::{RunControl, RunEvents, RunHandle};
use crate::orchestrator::messages::{ErrorKind, RunEvent, RunOutcome, RunReport, RunSummary};
use crate::orchestrator::progress::translate_tick;
use crate::orchestrator::request::DownloadRequest;
use crate::orchestrator::state::RunState;
use crate::selection::SelectionDecision;
use crate::utils::config::RetryConfig;
use crate::utils::error::{AudioloaderError, Result};
use crate::utils::filename::collection_folder_name;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const EVENT_BUFFER: usize = 100;
const TICK_BUFFER: usize = 64;

/// Starts runs against one extractor with one retry policy
#[derive(Clone)]
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    retry: RetryConfig,
    history: Option<HistoryStore>,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn Extractor>, retry: RetryConfig) -> Self {
        Self {
            extractor,
            retry,
            history: None,
        }
    }

    /// Record every run that finishes with at least one completed item
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// Validate `request` and spawn its run on the tokio runtime.
    ///
    /// Invalid input is reported here, synchronously, and nothing is spawned.
    pub fn start(&self, request: DownloadRequest) -> Result<RunHandle> {
        let request = request.validated()?;
        let run_id = Uuid::new_v4().to_string();

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (selection_tx, selection_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        info!(
            "Starting run {} for {} ({} @ {}kbps)",
            run_id,
            request.url,
            request.audio_format,
            request.audio_quality.kbps()
        );

        let run = Run {
            extractor: Arc::clone(&self.extractor),
            retry: self.retry,
            history: self.history.clone(),
            events: event_tx,
            selection: selection_rx,
            cancel: cancel.clone(),
            state: RunState::new(request, self.retry.max_attempts),
        };

        let span = info_span!("run", run_id = %run_id);
        let join = tokio::spawn(run.execute(run_id.clone()).instrument(span));

        Ok(RunHandle::new(
            run_id,
            RunEvents::new(event_rx),
            RunControl::new(selection_tx, cancel),
            join,
        ))
    }
}

struct Run {
    extractor: Arc<dyn Extractor>,
    retry: RetryConfig,
    history: Option<HistoryStore>,
    events: mpsc::Sender<RunEvent>,
    selection: mpsc::Receiver<SelectionDecision>,
    cancel: CancellationToken,
    state: RunState,
}

impl Run {
    async fn execute(mut self, run_id: String) -> RunReport {
        let outcome = match self.drive().await {
            Ok(()) => RunOutcome::Finished,
            Err(kind) => RunOutcome::Aborted(kind),
        };
        debug!("Run ended: {:?}", outcome);

        let request = self.state.request.clone();
        let (completed, failed) = self.state.into_outcomes();
        RunReport {
            run_id,
            request,
            outcome,
            completed,
            failed,
        }
    }

    async fn drive(&mut self) -> std::result::Result<(), ErrorKind> {
        if self.cancel.is_cancelled() {
            return Err(self.abort(ErrorKind::Cancelled, "cancelled").await);
        }

        let url = self.state.request.url.clone();
        let extractor = Arc::clone(&self.extractor);

        let probed = tokio::select! {
            probed = extractor.probe(&url) => probed,
            _ = self.cancel.cancelled() => {
                return Err(self.abort(ErrorKind::Cancelled, "cancelled").await);
            }
        };

        let metadata = match probed {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("Probe of {} failed: {}", url, e);
                return Err(self.abort(ErrorKind::Probe, e.to_string()).await);
            }
        };

        let (items, target_dir) = match metadata.kind {
            MediaKind::Single => {
                let item = ItemRef::new(url.clone(), metadata.title.clone(), 1, url.clone());
                (vec![item], self.state.request.output_directory.clone())
            }
            MediaKind::Collection => self.await_selection(&metadata).await?,
        };
        self.state.metadata = Some(metadata);

        let options = FetchOptions {
            audio_format: self.state.request.audio_format,
            audio_quality: self.state.request.audio_quality,
            target_dir,
        };

        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            if let Err(kind) = self.fetch_with_retry(item, index + 1, total, &options).await {
                for rest in &items[index..] {
                    if !self.state.is_settled(rest) {
                        self.state.mark_failed(rest, "cancelled");
                    }
                }
                return Err(self.abort(kind, "cancelled").await);
            }
        }

        let summary = RunSummary {
            completed: self.state.completed_count(),
            failed: self.state.failed_count(),
        };
        if summary.failed > 0 {
            self.emit(RunEvent::progress(
                format!("Download completed with {} errors", summary.failed),
                100.0,
            ))
            .await;
        } else if self
            .state
            .metadata
            .as_ref()
            .map_or(false, |metadata| metadata.is_collection())
        {
            self.emit(RunEvent::progress("Playlist download complete", 100.0))
                .await;
        }

        self.record_history(&summary).await;
        info!(
            "Run finished: {} completed, {} failed",
            summary.completed, summary.failed
        );
        self.emit(RunEvent::Finished { summary }).await;
        Ok(())
    }

    /// Suspend until the caller picks a subset of `metadata`.
    /// Returns the chosen items and the directory they are written to.
    async fn await_selection(
        &mut self,
        metadata: &Metadata,
    ) -> std::result::Result<(Vec<ItemRef>, PathBuf), ErrorKind> {
        if metadata.items.is_empty() {
            return Err(self
                .abort(ErrorKind::EmptyCollection, "No entries found in playlist")
                .await);
        }

        info!(
            "Playlist '{}' has {} entries, waiting for selection",
            metadata.title,
            metadata.items.len()
        );
        self.emit(RunEvent::SelectionNeeded {
            metadata: metadata.clone(),
        })
        .await;

        let received = tokio::select! {
            decision = self.selection.recv() => decision,
            _ = self.cancel.cancelled() => None,
        };
        if self.cancel.is_cancelled() {
            return Err(self.abort(ErrorKind::Cancelled, "cancelled").await);
        }

        // A dropped control counts as an empty selection
        let decision = received.unwrap_or_default();
        let items = decision.apply(metadata);
        if decision.is_cancel() || items.is_empty() {
            return Err(self.abort(ErrorKind::SelectionCancelled, "cancelled").await);
        }

        let mut target_dir = self.state.request.output_directory.clone();
        if decision.create_subfolder {
            target_dir = target_dir.join(collection_folder_name(&metadata.title));
            if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
                error!("Failed to create {}: {}", target_dir.display(), e);
                return Err(self
                    .abort(
                        ErrorKind::Output,
                        format!("Failed to create folder {}: {}", target_dir.display(), e),
                    )
                    .await);
            }
        }

        info!(
            "{}/{} entries selected, writing to {}",
            items.len(),
            metadata.items.len(),
            target_dir.display()
        );
        Ok((items, target_dir))
    }

    /// Per-item retry loop. `Err` only on cancellation; an item that runs
    /// out of attempts is marked failed and the run goes on.
    async fn fetch_with_retry(
        &mut self,
        item: &ItemRef,
        index: usize,
        total: usize,
        options: &FetchOptions,
    ) -> std::result::Result<(), ErrorKind> {
        let max = self.retry.max_attempts;

        loop {
            if self.cancel.is_cancelled() {
                return Err(ErrorKind::Cancelled);
            }

            let Some(attempt) = self.state.begin_attempt(item) else {
                self.state.mark_failed(item, "no attempts left");
                return Ok(());
            };

            self.emit(RunEvent::progress(
                format!(
                    "Processing item {}/{} (attempt {}/{})",
                    index, total, attempt, max
                ),
                (index - 1) as f64 * 100.0 / total as f64,
            ))
            .await;

            let cause = match self.fetch_once(item, options).await {
                Ok(()) => {
                    info!("Item {} '{}' done", index, item.title);
                    self.state.mark_completed(item);
                    return Ok(());
                }
                Err(AudioloaderError::Cancelled) => return Err(ErrorKind::Cancelled),
                Err(e) => e.to_string(),
            };

            if attempt >= max {
                error!(
                    "Item {} '{}' failed after {} attempts: {}",
                    index, item.title, max, cause
                );
                self.emit(RunEvent::error(
                    ErrorKind::Fetch,
                    format!(
                        "Failed to download item {} after {} attempts: {}",
                        index, max, cause
                    ),
                ))
                .await;
                self.state.mark_failed(item, cause);
                return Ok(());
            }

            warn!(
                "Attempt {}/{} for item {} failed: {}. Retrying in {:?}",
                attempt, max, index, cause, self.retry.delay
            );
            self.emit(RunEvent::RetryNotice {
                error: cause,
                delay_secs: self.retry.delay_secs(),
            })
            .await;

            tokio::select! {
                _ = tokio::time::sleep(self.retry.delay) => {}
                _ = self.cancel.cancelled() => return Err(ErrorKind::Cancelled),
            }
        }
    }

    /// One fetch call, relaying the extractor's progress while it runs
    async fn fetch_once(&self, item: &ItemRef, options: &FetchOptions) -> Result<()> {
        let (tick_tx, mut tick_rx) = mpsc::channel(TICK_BUFFER);
        let extractor = Arc::clone(&self.extractor);
        let fetch = extractor.fetch(&item.url, options, tick_tx, self.cancel.clone());
        tokio::pin!(fetch);

        let result = loop {
            tokio::select! {
                result = &mut fetch => break result,
                Some(tick) = tick_rx.recv() => {
                    self.emit(translate_tick(&tick, options.audio_format)).await;
                }
            }
        };

        while let Ok(tick) = tick_rx.try_recv() {
            self.emit(translate_tick(&tick, options.audio_format)).await;
        }

        result
    }

    async fn record_history(&self, summary: &RunSummary) {
        let Some(history) = &self.history else {
            return;
        };
        if summary.completed == 0 {
            debug!("Nothing completed, skipping history");
            return;
        }
        if let Err(e) = history
            .append(HistoryEntry::from_request(&self.state.request))
            .await
        {
            warn!("Failed to append history entry: {}", e);
        }
    }

    /// Emit the terminal error for `kind` and hand the kind back
    async fn abort(&self, kind: ErrorKind, message: impl Into<String>) -> ErrorKind {
        let message = message.into();
        warn!("Run aborted ({:?}): {}", kind, message);
        self.emit(RunEvent::error(kind, message)).await;
        kind
    }

    async fn emit(&self, event: RunEvent) {
        debug!("Event: {:?}", event);
        // Best-effort: a caller that stopped listening does not stop the run
        let _ = self.events.send(event).await;
    }
}
