//! Request building: slate candidates to dispatchable work items.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::config::RequestBuilderConfig;
use crate::error::BatchResult;
use crate::source::{Candidate, EntitySource, LineSource};

use super::item::WorkItem;

/// Builds the ordered dispatch list for a slate date.
///
/// Line resolution is tiered: an authoritative published line wins; failing
/// that, the player's historical average rounded to the nearest half; with
/// no history at all, the configured default. One candidate's resolution
/// error excludes that candidate and never aborts the build.
pub struct RequestBuilder {
    config: RequestBuilderConfig,
    entities: Arc<dyn EntitySource>,
    lines: Arc<dyn LineSource>,
}

impl RequestBuilder {
    /// Create a builder over the given sources.
    pub fn new(
        config: RequestBuilderConfig,
        entities: Arc<dyn EntitySource>,
        lines: Arc<dyn LineSource>,
    ) -> Self {
        Self {
            config,
            entities,
            lines,
        }
    }

    /// Build work items for the slate date.
    ///
    /// Dates in the past or beyond the lookahead bound yield an empty list
    /// rather than an error, so the coordinator can no-op safely. An
    /// unreachable entity source is the only hard failure.
    pub async fn build(&self, batch_id: &str, slate_date: NaiveDate) -> BatchResult<Vec<WorkItem>> {
        let today = Utc::now().date_naive();
        if slate_date < today {
            debug!(slate_date = %slate_date, "slate date in the past, empty build");
            return Ok(Vec::new());
        }
        let horizon = today + Duration::days(self.config.max_lookahead_days);
        if slate_date > horizon {
            debug!(
                slate_date = %slate_date,
                lookahead_days = self.config.max_lookahead_days,
                "slate date beyond lookahead, empty build"
            );
            return Ok(Vec::new());
        }

        let candidates = self.entities.fetch_candidates(slate_date).await?;
        debug!(slate_date = %slate_date, candidates = candidates.len(), "candidates fetched");

        let mut items = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if candidate.entity_key.trim().is_empty() {
                warn!("candidate with empty entity key skipped");
                continue;
            }
            if candidate.projected_minutes < self.config.min_projected_minutes {
                debug!(
                    entity_key = %candidate.entity_key,
                    projected_minutes = candidate.projected_minutes,
                    "below minutes floor, skipped"
                );
                continue;
            }

            match self.resolve_lines(candidate, slate_date).await {
                Ok(lines) => {
                    items.push(WorkItem::from_candidate(batch_id, slate_date, candidate, lines));
                }
                Err(err) => {
                    warn!(
                        entity_key = %candidate.entity_key,
                        error = %err,
                        "line resolution failed, excluded from batch"
                    );
                }
            }
        }

        Ok(items)
    }

    async fn resolve_lines(
        &self,
        candidate: &Candidate,
        slate_date: NaiveDate,
    ) -> BatchResult<Vec<f64>> {
        let line = self.resolve_line(candidate, slate_date).await?;
        if self.config.ladder {
            Ok(ladder_lines(line))
        } else {
            Ok(vec![line])
        }
    }

    async fn resolve_line(&self, candidate: &Candidate, slate_date: NaiveDate) -> BatchResult<f64> {
        if let Some(published) = self
            .lines
            .published_line(&candidate.entity_key, slate_date)
            .await?
        {
            return Ok(published);
        }

        match self.lines.historical_average(&candidate.entity_key).await? {
            Some(average) => Ok(round_to_half(average)),
            None => Ok(self.config.default_line),
        }
    }
}

/// Round to the nearest half unit.
fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// Five-line ladder around the resolved line, monotonically increasing.
fn ladder_lines(center: f64) -> Vec<f64> {
    (-2..=2).map(|step| center + step as f64).collect()
}
