//! Thread-safe progress tracking for one batch.
//!
//! The tracker is the single source of truth for batch progress. Worker
//! callbacks land on it from any number of concurrent contexts, in any
//! order, with at-least-once delivery; every entry point is a short
//! check-and-update under one lock so duplicate events collapse to a single
//! effect and snapshots are never torn.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::summary::{percentile_ms, BatchSummary};

/// Failure outcome recorded for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Entity key the failure applies to.
    pub entity_key: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Point-in-time view of batch progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Number of entities the batch expects to account for.
    pub expected: usize,
    /// Entities that completed.
    pub completed: usize,
    /// Entities that failed.
    pub failed: usize,
    /// Entities not yet accounted for, floored at zero.
    pub remaining: usize,
    /// Running sum of sub-results across completions.
    pub total_sub_results: u64,
    /// Completed share of expected, as a percentage.
    pub progress_percent: f64,
    /// Whether completed + failed has reached expected.
    pub is_complete: bool,
}

impl ProgressSnapshot {
    /// Render a one-line progress readout.
    pub fn format_line(&self) -> String {
        format!(
            "{}/{} completed ({:.1}%), {} failed, {} remaining, {} sub-results",
            self.completed,
            self.expected,
            self.progress_percent,
            self.failed,
            self.remaining,
            self.total_sub_results
        )
    }
}

#[derive(Debug)]
struct ProgressState {
    expected: usize,
    completed: HashSet<String>,
    failed: HashMap<String, String>,
    total_sub_results: u64,
    started_at: DateTime<Utc>,
    started_instant: Instant,
    completed_at: Option<DateTime<Utc>>,
    completed_instant: Option<Instant>,
    last_event: Option<Instant>,
    /// Millisecond offsets of first-occurrence completions from batch start.
    completion_offsets_ms: Vec<u64>,
}

impl ProgressState {
    fn new(expected: usize) -> Self {
        Self {
            expected,
            completed: HashSet::new(),
            failed: HashMap::new(),
            total_sub_results: 0,
            started_at: Utc::now(),
            started_instant: Instant::now(),
            completed_at: None,
            completed_instant: None,
            last_event: None,
            completion_offsets_ms: Vec::new(),
        }
    }

    fn accounted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    /// Close the accounting clock if this mutation filled the batch.
    /// Returns true only for the call that crossed the threshold.
    fn close_if_filled(&mut self, now: Instant) -> bool {
        if self.completed_at.is_none() && self.expected > 0 && self.accounted() >= self.expected {
            self.completed_at = Some(Utc::now());
            self.completed_instant = Some(now);
            return true;
        }
        false
    }
}

/// Thread-safe progress tracker for one batch.
///
/// Clones share the same underlying state, so a tracker handle can be given
/// to the delivery side of the queue while the coordinator polls its own.
/// One tracker instance per batch; [`ProgressTracker::reset`] re-zeroes an
/// instance that is being reused for a new batch.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressState>>,
}

impl ProgressTracker {
    /// Create a tracker expecting the given number of entities.
    pub fn new(expected: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProgressState::new(expected))),
        }
    }

    /// Update the expected entity count.
    ///
    /// The dispatcher arms the tracker with this before the first publish so
    /// no callback can race ahead of initialization.
    pub fn set_expected(&self, expected: usize) {
        if let Ok(mut state) = self.inner.lock() {
            state.expected = expected;
        }
    }

    /// Record a completion event for an entity.
    ///
    /// Idempotent per entity key: the first occurrence adds the key to the
    /// completed set and credits its sub-results; any repeat is a no-op that
    /// returns `false`. Returns `true` on exactly one call per batch, the
    /// one whose completion brings completed + failed up to expected. An
    /// empty entity key is a no-op. A key previously marked failed is
    /// promoted to completed.
    pub fn process_completion_event(&self, entity_key: &str, sub_result_count: u64) -> bool {
        if entity_key.trim().is_empty() {
            return false;
        }

        let mut crossed = false;
        let mut duplicate = false;
        let mut beyond_expected = false;

        if let Ok(mut state) = self.inner.lock() {
            let now = Instant::now();
            state.last_event = Some(now);

            if state.completed.contains(entity_key) {
                duplicate = true;
            } else {
                state.failed.remove(entity_key);
                state.completed.insert(entity_key.to_string());
                state.total_sub_results = state.total_sub_results.saturating_add(sub_result_count);
                let offset_ms = now.duration_since(state.started_instant).as_millis() as u64;
                state.completion_offsets_ms.push(offset_ms);

                beyond_expected = state.accounted() > state.expected;
                crossed = state.close_if_filled(now);
            }
        }

        if duplicate {
            debug!(entity_key = %entity_key, "duplicate completion ignored");
        } else if beyond_expected {
            debug!(entity_key = %entity_key, "completion beyond expected count");
        }

        crossed
    }

    /// Record a failure for an entity.
    ///
    /// Idempotent per entity key; the first reason recorded wins. An entity
    /// already in the completed set stays completed. Failures close the
    /// accounting clock when they fill the batch, but the batch-complete
    /// signal is only ever returned by [`Self::process_completion_event`].
    pub fn mark_failed(&self, entity_key: &str, reason: impl Into<String>) {
        if entity_key.trim().is_empty() {
            return;
        }

        if let Ok(mut state) = self.inner.lock() {
            let now = Instant::now();
            state.last_event = Some(now);

            if state.completed.contains(entity_key) || state.failed.contains_key(entity_key) {
                return;
            }
            state.failed.insert(entity_key.to_string(), reason.into());
            state.close_if_filled(now);
        }
    }

    /// Take a consistent snapshot of current progress.
    pub fn get_progress(&self) -> ProgressSnapshot {
        if let Ok(state) = self.inner.lock() {
            let accounted = state.accounted();
            let progress_percent = if state.expected == 0 {
                100.0
            } else {
                ((state.completed.len() as f64 / state.expected as f64) * 100.0).min(100.0)
            };
            ProgressSnapshot {
                expected: state.expected,
                completed: state.completed.len(),
                failed: state.failed.len(),
                remaining: state.expected.saturating_sub(accounted),
                total_sub_results: state.total_sub_results,
                progress_percent,
                is_complete: accounted >= state.expected,
            }
        } else {
            ProgressSnapshot {
                expected: 0,
                completed: 0,
                failed: 0,
                remaining: 0,
                total_sub_results: 0,
                progress_percent: 0.0,
                is_complete: false,
            }
        }
    }

    /// Build the batch summary from current state.
    ///
    /// Callable at any time; before completion the elapsed duration runs to
    /// now and `completed_at` is `None`.
    pub fn get_summary(&self) -> BatchSummary {
        if let Ok(state) = self.inner.lock() {
            let completed = state.completed.len();
            let success_rate = if state.expected == 0 {
                100.0
            } else {
                ((completed as f64 / state.expected as f64) * 100.0).min(100.0)
            };
            let avg_sub_results_per_entity = if completed == 0 {
                0.0
            } else {
                state.total_sub_results as f64 / completed as f64
            };
            let elapsed = match state.completed_instant {
                Some(done) => done.duration_since(state.started_instant),
                None => state.started_instant.elapsed(),
            };
            let mut offsets = state.completion_offsets_ms.clone();

            BatchSummary {
                expected: state.expected,
                completed,
                failed: state.failed.len(),
                total_sub_results: state.total_sub_results,
                avg_sub_results_per_entity,
                success_rate,
                started_at: state.started_at,
                completed_at: state.completed_at,
                elapsed,
                p50_ms: percentile_ms(&mut offsets, 50.0),
                p95_ms: percentile_ms(&mut offsets, 95.0),
                p99_ms: percentile_ms(&mut offsets, 99.0),
            }
        } else {
            BatchSummary {
                expected: 0,
                completed: 0,
                failed: 0,
                total_sub_results: 0,
                avg_sub_results_per_entity: 0.0,
                success_rate: 0.0,
                started_at: Utc::now(),
                completed_at: None,
                elapsed: Duration::ZERO,
                p50_ms: 0,
                p95_ms: 0,
                p99_ms: 0,
            }
        }
    }

    /// Whether the batch has gone quiet for longer than `threshold`.
    ///
    /// A complete batch is never stalled, and neither is one that has not
    /// seen a single event yet; an untouched batch is pending, not stalled.
    /// Any well-formed event, including a duplicate completion, refreshes
    /// the quiet-period clock.
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        if let Ok(state) = self.inner.lock() {
            if state.accounted() >= state.expected {
                return false;
            }
            match state.last_event {
                Some(last) => last.elapsed() > threshold,
                None => false,
            }
        } else {
            false
        }
    }

    /// Entities from `all_entity_keys` accounted for by neither completion
    /// nor failure, sorted and deduplicated.
    pub fn get_missing(&self, all_entity_keys: &[String]) -> Vec<String> {
        if let Ok(state) = self.inner.lock() {
            let mut missing: Vec<String> = all_entity_keys
                .iter()
                .filter(|key| !state.completed.contains(*key) && !state.failed.contains_key(*key))
                .cloned()
                .collect();
            missing.sort();
            missing.dedup();
            missing
        } else {
            Vec::new()
        }
    }

    /// Recorded failures, sorted by entity key.
    pub fn get_failures(&self) -> Vec<FailureRecord> {
        if let Ok(state) = self.inner.lock() {
            let mut failures: Vec<FailureRecord> = state
                .failed
                .iter()
                .map(|(entity_key, reason)| FailureRecord {
                    entity_key: entity_key.clone(),
                    reason: reason.clone(),
                })
                .collect();
            failures.sort_by(|a, b| a.entity_key.cmp(&b.entity_key));
            failures
        } else {
            Vec::new()
        }
    }

    /// Clear all accumulated state back to the initial condition.
    ///
    /// The expected count drops to zero; re-arm with
    /// [`Self::set_expected`] before the next dispatch.
    pub fn reset(&self) {
        if let Ok(mut state) = self.inner.lock() {
            *state = ProgressState::new(0);
        }
    }
}
