//! Work queue publish port.

use async_trait::async_trait;

use crate::error::BatchResult;
use crate::request::WorkItem;

/// Publish interface for handing work items to the worker pool.
///
/// The delivery side of the queue is out of band: implementations invoke the
/// batch's [`crate::event::EventRouter`] with raw payload bytes, at
/// arbitrary concurrency, with at-least-once and unordered delivery.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish a single work item.
    ///
    /// A failed publish for one item is recorded by the dispatcher as that
    /// entity's failure; it does not stop the rest of the batch.
    async fn publish(&self, item: &WorkItem) -> BatchResult<()>;
}
