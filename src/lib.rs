//! Coordination core for daily projection batches.
//!
//! slatecast drives a one-shot batch of per-player prediction jobs over a
//! message bus: build the work items for a slate, publish each one once,
//! then absorb concurrent, out-of-order, at-least-once worker callbacks
//! until the batch completes, stalls, or runs out of wall-clock budget,
//! and finally reconcile which players never answered.
//!
//! # Overview
//!
//! - [`request::RequestBuilder`]: turns slate candidates into work items,
//!   resolving each player's points line through a tiered lookup
//! - [`dispatch::Dispatcher`]: publishes the batch, arming the tracker
//!   before the first item goes out
//! - [`progress::ProgressTracker`]: the concurrency core; idempotent event
//!   accounting, consistent snapshots, stall detection, reconciliation
//! - [`coordinator::Coordinator`]: sequences build, dispatch, awaiting,
//!   and finalization under stall and timeout policy
//!
//! External collaborators (entity store, line feed, message bus, report
//! backend) sit behind the traits in [`source`], [`queue`], and
//! [`report`]; the [`inmem`] module ships in-memory versions of all of
//! them, including a simulated worker pool.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use slatecast::config::{CoordinatorConfig, RequestBuilderConfig};
//! use slatecast::coordinator::Coordinator;
//! use slatecast::dispatch::Dispatcher;
//! use slatecast::event::EventRouter;
//! use slatecast::inmem::{
//!     InMemoryEntitySource, InMemoryLineSource, SimulatedWorkerQueue, WorkerSimConfig,
//! };
//! use slatecast::progress::ProgressTracker;
//! use slatecast::report::LogReportSink;
//! use slatecast::request::RequestBuilder;
//!
//! # async fn run() -> slatecast::error::BatchResult<()> {
//! let tracker = ProgressTracker::new(0);
//! let queue = Arc::new(SimulatedWorkerQueue::new(
//!     EventRouter::new(tracker.clone()),
//!     WorkerSimConfig::new(),
//! ));
//! let builder = RequestBuilder::new(
//!     RequestBuilderConfig::default(),
//!     Arc::new(InMemoryEntitySource::synthetic(25)),
//!     Arc::new(InMemoryLineSource::new()),
//! );
//! let coordinator = Coordinator::with_tracker(
//!     CoordinatorConfig::default(),
//!     builder,
//!     Dispatcher::new(queue.clone()),
//!     Arc::new(LogReportSink),
//!     tracker,
//! );
//!
//! let outcome = coordinator.run(chrono::Utc::now().date_naive()).await?;
//! println!("{}", outcome.summary.format_table());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod inmem;
pub mod progress;
pub mod queue;
pub mod report;
pub mod request;
pub mod source;

pub use config::{CoordinatorConfig, RequestBuilderConfig, Settings};
pub use coordinator::{AbortHandle, BatchDisposition, BatchOutcome, Coordinator};
pub use dispatch::Dispatcher;
pub use error::{BatchError, BatchResult};
pub use event::{EventRouter, WorkerEvent};
pub use progress::{BatchSummary, FailureRecord, ProgressSnapshot, ProgressTracker};
pub use queue::WorkQueue;
pub use report::{JsonlReportSink, LogReportSink, ReportSink};
pub use request::{RequestBuilder, WorkItem};
pub use source::{Candidate, EntitySource, LineSource};
