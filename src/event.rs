//! Worker event payloads and boundary routing.
//!
//! The delivery side of the work queue hands raw payload bytes to an
//! [`EventRouter`], which decodes them into the tagged [`WorkerEvent`] sum
//! type and feeds the batch's progress tracker. Malformed payloads and
//! events with an empty entity key are logged and dropped at this boundary;
//! nothing worker-originated ever propagates as an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::progress::ProgressTracker;

/// A single worker-originated signal, decoded at the delivery boundary.
///
/// Wire payloads are tagged JSON objects:
///
/// ```json
/// {"type": "completion", "entity_key": "player-001", "sub_result_count": 5}
/// {"type": "failure", "entity_key": "player-002", "reason": "no lineup data"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// One entity's work finished successfully.
    Completion {
        /// Entity key the completion applies to.
        entity_key: String,
        /// Number of sub-results the worker produced.
        sub_result_count: u64,
        /// Reporting worker, when the transport carries it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<String>,
    },
    /// One entity's work failed.
    Failure {
        /// Entity key the failure applies to.
        entity_key: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl WorkerEvent {
    /// Entity key the event refers to.
    pub fn entity_key(&self) -> &str {
        match self {
            WorkerEvent::Completion { entity_key, .. } => entity_key,
            WorkerEvent::Failure { entity_key, .. } => entity_key,
        }
    }
}

/// Routes worker events into a batch's progress tracker.
#[derive(Debug, Clone)]
pub struct EventRouter {
    tracker: ProgressTracker,
}

impl EventRouter {
    /// Create a router feeding the given tracker.
    pub fn new(tracker: ProgressTracker) -> Self {
        Self { tracker }
    }

    /// Route one decoded event.
    ///
    /// Returns `true` only when a completion event closed the batch.
    pub fn route(&self, event: WorkerEvent) -> bool {
        if event.entity_key().trim().is_empty() {
            warn!("worker event with empty entity key dropped");
            return false;
        }

        match event {
            WorkerEvent::Completion {
                entity_key,
                sub_result_count,
                worker_id,
            } => {
                debug!(
                    entity_key = %entity_key,
                    sub_result_count,
                    worker_id = worker_id.as_deref().unwrap_or("unknown"),
                    "completion event received"
                );
                self.tracker
                    .process_completion_event(&entity_key, sub_result_count)
            }
            WorkerEvent::Failure { entity_key, reason } => {
                debug!(entity_key = %entity_key, reason = %reason, "failure event received");
                self.tracker.mark_failed(&entity_key, reason);
                false
            }
        }
    }

    /// Decode raw payload bytes and route the event.
    ///
    /// Undecodable payloads are dropped with a warning and return `false`.
    pub fn route_payload(&self, payload: &[u8]) -> bool {
        match serde_json::from_slice::<WorkerEvent>(payload) {
            Ok(event) => self.route(event),
            Err(err) => {
                warn!(error = %err, "malformed worker payload dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_routes_into_tracker() {
        let tracker = ProgressTracker::new(2);
        let router = EventRouter::new(tracker.clone());

        let closed = router.route(WorkerEvent::Completion {
            entity_key: "player-001".to_string(),
            sub_result_count: 5,
            worker_id: Some("worker-a".to_string()),
        });

        assert!(!closed);
        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total_sub_results, 5);
    }

    #[test]
    fn test_failure_routes_into_tracker() {
        let tracker = ProgressTracker::new(2);
        let router = EventRouter::new(tracker.clone());

        let closed = router.route(WorkerEvent::Failure {
            entity_key: "player-001".to_string(),
            reason: "no lineup data".to_string(),
        });

        assert!(!closed);
        assert_eq!(tracker.get_progress().failed, 1);
        assert_eq!(tracker.get_failures()[0].reason, "no lineup data");
    }

    #[test]
    fn test_final_completion_reports_batch_closed() {
        let tracker = ProgressTracker::new(1);
        let router = EventRouter::new(tracker);

        let closed = router.route(WorkerEvent::Completion {
            entity_key: "player-001".to_string(),
            sub_result_count: 1,
            worker_id: None,
        });

        assert!(closed);
    }

    #[test]
    fn test_empty_key_event_dropped() {
        let tracker = ProgressTracker::new(1);
        let router = EventRouter::new(tracker.clone());

        router.route(WorkerEvent::Completion {
            entity_key: "  ".to_string(),
            sub_result_count: 5,
            worker_id: None,
        });
        router.route(WorkerEvent::Failure {
            entity_key: String::new(),
            reason: "bad".to_string(),
        });

        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.failed, 0);
    }

    #[test]
    fn test_payload_decodes_and_routes() {
        let tracker = ProgressTracker::new(1);
        let router = EventRouter::new(tracker.clone());

        let payload =
            br#"{"type": "completion", "entity_key": "player-001", "sub_result_count": 3}"#;
        let closed = router.route_payload(payload);

        assert!(closed);
        assert_eq!(tracker.get_progress().total_sub_results, 3);
    }

    #[test]
    fn test_failure_payload_decodes_and_routes() {
        let tracker = ProgressTracker::new(2);
        let router = EventRouter::new(tracker.clone());

        let payload = br#"{"type": "failure", "entity_key": "player-002", "reason": "scratched"}"#;
        assert!(!router.route_payload(payload));
        assert_eq!(tracker.get_progress().failed, 1);
    }

    #[test]
    fn test_malformed_payload_dropped() {
        let tracker = ProgressTracker::new(1);
        let router = EventRouter::new(tracker.clone());

        assert!(!router.route_payload(b"not json at all"));
        assert!(!router.route_payload(br#"{"type": "heartbeat", "entity_key": "x"}"#));
        assert!(!router.route_payload(br#"{"entity_key": "player-001"}"#));

        let progress = tracker.get_progress();
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.failed, 0);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = WorkerEvent::Completion {
            entity_key: "player-001".to_string(),
            sub_result_count: 5,
            worker_id: None,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""type":"completion""#));
        assert!(!json.contains("worker_id"));
    }
}
