//! Batch lifecycle coordination.
//!
//! The coordinator sequences one slate batch through build, dispatch, an
//! awaiting poll loop, and finalization. Stall and timeout policy live
//! here, not in the tracker: the tracker reports how quiet the batch has
//! been, the coordinator decides when quiet means stalled.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::CoordinatorConfig;
use crate::dispatch::Dispatcher;
use crate::error::BatchResult;
use crate::event::EventRouter;
use crate::progress::{BatchSummary, FailureRecord, ProgressTracker};
use crate::report::ReportSink;
use crate::request::RequestBuilder;

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDisposition {
    /// Every expected entity was accounted for.
    Completed,
    /// The batch went quiet past the stall threshold, or ran past the
    /// wall-clock budget, with entities still unaccounted for.
    Stalled,
    /// An abort signal short-circuited the awaiting loop.
    Aborted,
    /// The build produced no work items.
    Empty,
}

impl BatchDisposition {
    /// Stable lowercase label for logs and reports.
    pub fn as_label(&self) -> &'static str {
        match self {
            BatchDisposition::Completed => "completed",
            BatchDisposition::Stalled => "stalled",
            BatchDisposition::Aborted => "aborted",
            BatchDisposition::Empty => "empty",
        }
    }
}

impl fmt::Display for BatchDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Final accounting for one finalized batch.
///
/// A stalled or aborted batch still produces an outcome; the disposition
/// and the missing set carry the bad news, not an error.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Batch identifier.
    pub batch_id: String,
    /// Slate date the batch was built for.
    pub slate_date: NaiveDate,
    /// How the batch ended.
    pub disposition: BatchDisposition,
    /// Final summary from the tracker.
    pub summary: BatchSummary,
    /// Entities accounted for by neither completion nor failure.
    pub missing: Vec<String>,
    /// Recorded per-entity failures.
    pub failures: Vec<FailureRecord>,
}

/// Handle for aborting an in-flight batch from another task.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Request that the current run stop at its next poll.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// Drives one slate batch at a time from build through finalization.
pub struct Coordinator {
    config: CoordinatorConfig,
    builder: RequestBuilder,
    dispatcher: Dispatcher,
    tracker: ProgressTracker,
    sink: Arc<dyn ReportSink>,
    abort_tx: Arc<watch::Sender<bool>>,
}

impl Coordinator {
    /// Create a coordinator with its own fresh tracker.
    pub fn new(
        config: CoordinatorConfig,
        builder: RequestBuilder,
        dispatcher: Dispatcher,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self::with_tracker(config, builder, dispatcher, sink, ProgressTracker::new(0))
    }

    /// Create a coordinator over an externally created tracker.
    ///
    /// The delivery side of the queue usually needs a tracker handle before
    /// the coordinator exists; build the tracker first, hand clones to both.
    pub fn with_tracker(
        config: CoordinatorConfig,
        builder: RequestBuilder,
        dispatcher: Dispatcher,
        sink: Arc<dyn ReportSink>,
        tracker: ProgressTracker,
    ) -> Self {
        let (abort_tx, _abort_rx) = watch::channel(false);
        Self {
            config,
            builder,
            dispatcher,
            tracker,
            sink,
            abort_tx: Arc::new(abort_tx),
        }
    }

    /// Get the coordinator configuration.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Handle to the shared tracker.
    pub fn tracker(&self) -> ProgressTracker {
        self.tracker.clone()
    }

    /// Event router bound to the shared tracker.
    pub fn router(&self) -> EventRouter {
        EventRouter::new(self.tracker.clone())
    }

    /// Handle for aborting the current run from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: Arc::clone(&self.abort_tx),
        }
    }

    /// Run one batch for the slate date through to finalization.
    ///
    /// The shared tracker is reset on entry, so a coordinator drives one
    /// batch at a time. Only an unreachable entity source or a total queue
    /// outage surfaces as an error; a stalled, aborted, or empty batch is a
    /// normal outcome.
    pub async fn run(&self, slate_date: NaiveDate) -> BatchResult<BatchOutcome> {
        let batch_id = generate_batch_id();
        self.abort_tx.send_replace(false);
        self.tracker.reset();

        info!(batch_id = %batch_id, slate_date = %slate_date, "building batch");
        let items = self.builder.build(&batch_id, slate_date).await?;
        let expected_keys: Vec<String> =
            items.iter().map(|item| item.entity_key.clone()).collect();

        if items.is_empty() {
            info!(batch_id = %batch_id, "no work items built, finalizing empty batch");
            return self
                .finalize(batch_id, slate_date, BatchDisposition::Empty, &expected_keys)
                .await;
        }

        let expected = self.dispatcher.dispatch(&items, &self.tracker).await?;
        info!(batch_id = %batch_id, expected, "batch dispatched, awaiting completions");

        let started = Instant::now();
        let disposition = loop {
            let progress = self.tracker.get_progress();
            if progress.is_complete {
                info!(batch_id = %batch_id, "all entities accounted for");
                break BatchDisposition::Completed;
            }
            if *self.abort_tx.borrow() {
                warn!(batch_id = %batch_id, "abort requested, finalizing early");
                break BatchDisposition::Aborted;
            }
            if self.tracker.is_stalled(self.config.stall_threshold) {
                warn!(
                    batch_id = %batch_id,
                    threshold = ?self.config.stall_threshold,
                    "no progress within stall threshold"
                );
                break BatchDisposition::Stalled;
            }
            if started.elapsed() >= self.config.batch_timeout {
                warn!(
                    batch_id = %batch_id,
                    timeout = ?self.config.batch_timeout,
                    "batch exceeded wall-clock budget"
                );
                break BatchDisposition::Stalled;
            }

            debug!(batch_id = %batch_id, "{}", progress.format_line());
            tokio::time::sleep(self.config.poll_interval).await;
        };

        self.finalize(batch_id, slate_date, disposition, &expected_keys)
            .await
    }

    async fn finalize(
        &self,
        batch_id: String,
        slate_date: NaiveDate,
        disposition: BatchDisposition,
        expected_keys: &[String],
    ) -> BatchResult<BatchOutcome> {
        let outcome = BatchOutcome {
            batch_id,
            slate_date,
            disposition,
            summary: self.tracker.get_summary(),
            missing: self.tracker.get_missing(expected_keys),
            failures: self.tracker.get_failures(),
        };

        // A broken sink never changes the disposition.
        if let Err(err) = self.sink.report(&outcome).await {
            error!(batch_id = %outcome.batch_id, error = %err, "report sink failed");
        }

        info!(
            batch_id = %outcome.batch_id,
            disposition = outcome.disposition.as_label(),
            completed = outcome.summary.completed,
            failed = outcome.summary.failed,
            missing = outcome.missing.len(),
            "batch finalized"
        );
        Ok(outcome)
    }
}

/// Generate a batch ID using timestamp and process ID.
pub fn generate_batch_id() -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let pid = std::process::id();
    format!("batch-{}-{}", millis, pid)
}
