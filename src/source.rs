//! External data ports: slate candidates and line lookups.
//!
//! The coordination core stays decoupled from the analytical store behind
//! these traits; production adapters query it, the `inmem` adapters back
//! simulations and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BatchResult;

/// A player eligible for projection on a slate date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque entity key, unique within the slate.
    pub entity_key: String,
    /// Grouping key for the game the player appears in.
    pub game_id: String,
    /// Opposing team key.
    pub opponent: String,
    /// Whether the player's team is at home.
    pub is_home: bool,
    /// Projected minutes for the slate date.
    pub projected_minutes: f64,
    /// Listed position.
    pub position: String,
}

/// Query interface for slate candidates.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Fetch candidates for the given slate date.
    ///
    /// An unreachable source is a hard error; an empty slate is `Ok` with an
    /// empty list.
    async fn fetch_candidates(&self, date: NaiveDate) -> BatchResult<Vec<Candidate>>;
}

/// Lookup interface for per-player line values.
#[async_trait]
pub trait LineSource: Send + Sync {
    /// Authoritative published line for the player on the date, if one
    /// exists.
    async fn published_line(&self, entity_key: &str, date: NaiveDate) -> BatchResult<Option<f64>>;

    /// The player's historical scoring average, if any history exists.
    async fn historical_average(&self, entity_key: &str) -> BatchResult<Option<f64>>;
}
