//! Dispatch of work items onto the queue.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};
use crate::progress::ProgressTracker;
use crate::queue::WorkQueue;
use crate::request::WorkItem;

/// Publishes a built batch onto the work queue.
///
/// The expected count is registered on the tracker before the first
/// publish, so completion events that arrive mid-dispatch are counted
/// against the full batch rather than a partial one.
pub struct Dispatcher {
    queue: Arc<dyn WorkQueue>,
}

impl Dispatcher {
    /// Create a dispatcher over the given queue.
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    /// Publish every item in order and return the expected entity count.
    ///
    /// A single failed publish marks that entity failed and moves on. If
    /// no item at all reaches the queue the batch cannot make progress,
    /// and that surfaces as a queue error.
    pub async fn dispatch(
        &self,
        items: &[WorkItem],
        tracker: &ProgressTracker,
    ) -> BatchResult<usize> {
        tracker.set_expected(items.len());
        if items.is_empty() {
            return Ok(0);
        }

        let mut published = 0usize;
        for item in items {
            match self.queue.publish(item).await {
                Ok(()) => {
                    published += 1;
                    debug!(entity_key = %item.entity_key, lines = item.lines.len(), "work item published");
                }
                Err(err) => {
                    warn!(entity_key = %item.entity_key, error = %err, "publish failed");
                    tracker.mark_failed(&item.entity_key, &format!("publish failed: {}", err));
                }
            }
        }

        if published == 0 {
            return Err(BatchError::Queue(format!(
                "none of {} work items reached the queue",
                items.len()
            )));
        }

        Ok(items.len())
    }
}
