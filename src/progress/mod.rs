//! Batch progress tracking.
//!
//! This module is the concurrency core of the crate: a per-batch aggregate
//! that absorbs completion and failure events from arbitrarily many
//! concurrent worker callbacks and answers consistent point-in-time
//! questions about the batch.
//!
//! # Overview
//!
//! - **ProgressTracker**: synchronized entry points for events, snapshots,
//!   stall detection, and reconciliation
//! - **ProgressSnapshot**: consistent point-in-time progress view
//! - **BatchSummary**: immutable totals, rates, and completion-time
//!   percentiles frozen at finalization
//! - **FailureRecord**: per-entity failure outcome with its reason
//!
//! # Example
//!
//! ```ignore
//! use slatecast::progress::ProgressTracker;
//!
//! let tracker = ProgressTracker::new(2);
//!
//! // Worker callbacks, from any task or thread:
//! tracker.process_completion_event("player-001", 5);
//! let closed = tracker.process_completion_event("player-002", 5);
//! assert!(closed);
//!
//! let progress = tracker.get_progress();
//! assert!(progress.is_complete);
//! ```

mod summary;
mod tracker;

pub use summary::BatchSummary;
pub use tracker::{FailureRecord, ProgressSnapshot, ProgressTracker};
