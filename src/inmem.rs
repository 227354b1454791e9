//! In-memory collaborators for tests and local dry runs.
//!
//! These adapters stand in for the analytical store, the sportsbook feed,
//! the message bus, and the reporting backend. The simulated worker queue
//! reproduces the delivery semantics the coordination core is built for:
//! parallel callbacks, arbitrary ordering, at-least-once delivery, and
//! workers that fail or never answer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::BatchOutcome;
use crate::error::BatchResult;
use crate::event::{EventRouter, WorkerEvent};
use crate::queue::WorkQueue;
use crate::report::ReportSink;
use crate::request::WorkItem;
use crate::source::{Candidate, EntitySource, LineSource};

/// Entity source over a fixed candidate list.
pub struct InMemoryEntitySource {
    candidates: Vec<Candidate>,
}

impl InMemoryEntitySource {
    /// Create a source that returns the given candidates for any date.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Generate a synthetic slate of `count` players.
    pub fn synthetic(count: usize) -> Self {
        let positions = ["PG", "SG", "SF", "PF", "C"];
        let candidates = (0..count)
            .map(|i| Candidate {
                entity_key: format!("player-{:03}", i + 1),
                game_id: format!("game-{:02}", i / 10 + 1),
                opponent: format!("team-{:02}", i % 15 + 1),
                is_home: i % 2 == 0,
                projected_minutes: 24.0 + (i % 12) as f64,
                position: positions[i % positions.len()].to_string(),
            })
            .collect();
        Self { candidates }
    }
}

#[async_trait]
impl EntitySource for InMemoryEntitySource {
    async fn fetch_candidates(&self, _date: NaiveDate) -> BatchResult<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Line source over fixed published-line and historical-average maps.
#[derive(Default)]
pub struct InMemoryLineSource {
    published: HashMap<String, f64>,
    averages: HashMap<String, f64>,
}

impl InMemoryLineSource {
    /// Create an empty source; every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a published line for an entity.
    pub fn with_published(mut self, entity_key: &str, line: f64) -> Self {
        self.published.insert(entity_key.to_string(), line);
        self
    }

    /// Add a historical average for an entity.
    pub fn with_average(mut self, entity_key: &str, average: f64) -> Self {
        self.averages.insert(entity_key.to_string(), average);
        self
    }
}

#[async_trait]
impl LineSource for InMemoryLineSource {
    async fn published_line(
        &self,
        entity_key: &str,
        _date: NaiveDate,
    ) -> BatchResult<Option<f64>> {
        Ok(self.published.get(entity_key).copied())
    }

    async fn historical_average(&self, entity_key: &str) -> BatchResult<Option<f64>> {
        Ok(self.averages.get(entity_key).copied())
    }
}

/// Behavior knobs for the simulated worker pool.
#[derive(Debug, Clone)]
pub struct WorkerSimConfig {
    /// Time a worker takes before answering.
    pub latency: Duration,
    /// Sub-results each completion reports.
    pub sub_results_per_item: u64,
    /// Entities whose worker reports a failure.
    pub fail_keys: HashSet<String>,
    /// Entities whose worker never answers at all.
    pub silent_keys: HashSet<String>,
    /// Times each completion event is delivered.
    pub deliveries_per_completion: u32,
}

impl Default for WorkerSimConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(2),
            sub_results_per_item: 5,
            fail_keys: HashSet::new(),
            silent_keys: HashSet::new(),
            deliveries_per_completion: 1,
        }
    }
}

impl WorkerSimConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-worker latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the sub-results reported per completion.
    pub fn with_sub_results_per_item(mut self, sub_results: u64) -> Self {
        self.sub_results_per_item = sub_results;
        self
    }

    /// Make the worker for an entity report a failure.
    pub fn with_fail_key(mut self, entity_key: &str) -> Self {
        self.fail_keys.insert(entity_key.to_string());
        self
    }

    /// Make the worker for an entity stay silent.
    pub fn with_silent_key(mut self, entity_key: &str) -> Self {
        self.silent_keys.insert(entity_key.to_string());
        self
    }

    /// Set how many times each completion is delivered.
    pub fn with_deliveries_per_completion(mut self, deliveries: u32) -> Self {
        self.deliveries_per_completion = deliveries;
        self
    }
}

/// Work queue whose delivery side is a simulated worker pool.
///
/// Each publish spawns a task that sleeps the configured latency, then
/// serializes a worker event and routes it back through the event router
/// the same way a bus consumer would. Completion events are delivered
/// `deliveries_per_completion` times to exercise at-least-once semantics.
pub struct SimulatedWorkerQueue {
    router: EventRouter,
    config: WorkerSimConfig,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SimulatedWorkerQueue {
    /// Create a queue delivering into the given router.
    pub fn new(router: EventRouter, config: WorkerSimConfig) -> Self {
        Self {
            router,
            config,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every simulated worker spawned so far.
    pub async fn drain(&self) {
        let drained: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .map(|mut handles| handles.drain(..).collect())
            .unwrap_or_default();
        let _ = futures::future::join_all(drained).await;
    }
}

#[async_trait]
impl WorkQueue for SimulatedWorkerQueue {
    async fn publish(&self, item: &WorkItem) -> BatchResult<()> {
        if self.config.silent_keys.contains(&item.entity_key) {
            debug!(entity_key = %item.entity_key, "simulated worker stays silent");
            return Ok(());
        }

        let router = self.router.clone();
        let config = self.config.clone();
        let entity_key = item.entity_key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(config.latency).await;

            if config.fail_keys.contains(&entity_key) {
                let event = WorkerEvent::Failure {
                    entity_key,
                    reason: "simulated worker failure".to_string(),
                };
                let payload = serde_json::to_vec(&event).unwrap_or_default();
                router.route_payload(&payload);
                return;
            }

            let event = WorkerEvent::Completion {
                entity_key,
                sub_result_count: config.sub_results_per_item,
                worker_id: Some("sim-worker".to_string()),
            };
            let payload = serde_json::to_vec(&event).unwrap_or_default();
            for _ in 0..config.deliveries_per_completion.max(1) {
                router.route_payload(&payload);
            }
        });

        if let Ok(mut handles) = self.handles.lock() {
            handles.push(handle);
        }
        Ok(())
    }
}

/// Report sink that buffers outcomes in memory.
#[derive(Default)]
pub struct BufferingReportSink {
    outcomes: Mutex<Vec<BatchOutcome>>,
}

impl BufferingReportSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes reported so far.
    pub fn outcomes(&self) -> Vec<BatchOutcome> {
        self.outcomes
            .lock()
            .map(|outcomes| outcomes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReportSink for BufferingReportSink {
    async fn report(&self, outcome: &BatchOutcome) -> BatchResult<()> {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push(outcome.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressTracker;
    use chrono::Utc;

    fn item(entity_key: &str) -> WorkItem {
        WorkItem {
            batch_id: "batch-1".to_string(),
            slate_date: Utc::now().date_naive(),
            entity_key: entity_key.to_string(),
            lines: vec![20.5],
            game_id: "game-01".to_string(),
            opponent: "team-02".to_string(),
            is_home: true,
            projected_minutes: 28.0,
            position: "C".to_string(),
        }
    }

    #[tokio::test]
    async fn test_synthetic_slate_is_distinct_and_eligible() {
        let source = InMemoryEntitySource::synthetic(30);
        let candidates = source
            .fetch_candidates(Utc::now().date_naive())
            .await
            .expect("fetch");

        assert_eq!(candidates.len(), 30);
        let keys: HashSet<_> = candidates.iter().map(|c| c.entity_key.clone()).collect();
        assert_eq!(keys.len(), 30);
        assert!(candidates.iter().all(|c| c.projected_minutes >= 24.0));
    }

    #[tokio::test]
    async fn test_line_source_lookups() {
        let source = InMemoryLineSource::new()
            .with_published("player-001", 27.5)
            .with_average("player-002", 18.7);
        let date = Utc::now().date_naive();

        assert_eq!(
            source.published_line("player-001", date).await.expect("lookup"),
            Some(27.5)
        );
        assert_eq!(
            source.historical_average("player-002").await.expect("lookup"),
            Some(18.7)
        );
        assert_eq!(
            source.published_line("player-999", date).await.expect("lookup"),
            None
        );
    }

    #[tokio::test]
    async fn test_simulated_queue_routes_completions() {
        let tracker = ProgressTracker::new(2);
        let queue = SimulatedWorkerQueue::new(
            EventRouter::new(tracker.clone()),
            WorkerSimConfig::new().with_latency(Duration::from_millis(1)),
        );

        queue.publish(&item("player-001")).await.expect("publish");
        queue.publish(&item("player-002")).await.expect("publish");
        queue.drain().await;

        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total_sub_results, 10);
        assert!(progress.is_complete);
    }

    #[tokio::test]
    async fn test_simulated_queue_failure_and_silence() {
        let tracker = ProgressTracker::new(3);
        let config = WorkerSimConfig::new()
            .with_latency(Duration::from_millis(1))
            .with_fail_key("player-001")
            .with_silent_key("player-002");
        let queue = SimulatedWorkerQueue::new(EventRouter::new(tracker.clone()), config);

        for key in ["player-001", "player-002", "player-003"] {
            queue.publish(&item(key)).await.expect("publish");
        }
        queue.drain().await;

        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.failed, 1);
        let all: Vec<String> = ["player-001", "player-002", "player-003"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(tracker.get_missing(&all), vec!["player-002".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_deliveries_collapse_to_one_effect() {
        let tracker = ProgressTracker::new(1);
        let config = WorkerSimConfig::new()
            .with_latency(Duration::from_millis(1))
            .with_deliveries_per_completion(3);
        let queue = SimulatedWorkerQueue::new(EventRouter::new(tracker.clone()), config);

        queue.publish(&item("player-001")).await.expect("publish");
        queue.drain().await;

        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total_sub_results, 5);
    }
}
