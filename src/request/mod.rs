//! Work item construction for a slate.
//!
//! [`RequestBuilder`] turns slate candidates into [`WorkItem`]s, applying
//! the minutes floor, tiered line resolution, and optional ladder
//! expansion. Items carry enough game context for workers to run without
//! further lookups.

mod builder;
mod item;

pub use builder::RequestBuilder;
pub use item::WorkItem;
