//! Dispatchable work items.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::source::Candidate;

/// A single unit of dispatchable work for one player.
///
/// Immutable once built; the dispatcher owns items until they are published.
/// The contextual fields are for the worker and opaque to the coordination
/// core, which only ever keys on `entity_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Batch the item belongs to.
    pub batch_id: String,
    /// Slate date the projection targets.
    pub slate_date: NaiveDate,
    /// Opaque entity key, unique within the batch.
    pub entity_key: String,
    /// Resolved line value(s): a single line, or the five-line ladder.
    pub lines: Vec<f64>,
    /// Game grouping key.
    pub game_id: String,
    /// Opposing team key.
    pub opponent: String,
    /// Whether the player's team is at home.
    pub is_home: bool,
    /// Projected minutes used for eligibility.
    pub projected_minutes: f64,
    /// Listed position.
    pub position: String,
}

impl WorkItem {
    /// Build an item from a slate candidate and its resolved lines.
    pub fn from_candidate(
        batch_id: impl Into<String>,
        slate_date: NaiveDate,
        candidate: &Candidate,
        lines: Vec<f64>,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            slate_date,
            entity_key: candidate.entity_key.clone(),
            lines,
            game_id: candidate.game_id.clone(),
            opponent: candidate.opponent.clone(),
            is_home: candidate.is_home,
            projected_minutes: candidate.projected_minutes,
            position: candidate.position.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candidate() -> Candidate {
        Candidate {
            entity_key: "player-001".to_string(),
            game_id: "game-01".to_string(),
            opponent: "team-02".to_string(),
            is_home: true,
            projected_minutes: 32.5,
            position: "PG".to_string(),
        }
    }

    #[test]
    fn test_from_candidate_carries_context() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).expect("date");
        let item = WorkItem::from_candidate("batch-1", date, &sample_candidate(), vec![24.5]);

        assert_eq!(item.batch_id, "batch-1");
        assert_eq!(item.slate_date, date);
        assert_eq!(item.entity_key, "player-001");
        assert_eq!(item.lines, vec![24.5]);
        assert_eq!(item.game_id, "game-01");
        assert!(item.is_home);
    }

    #[test]
    fn test_item_round_trips_through_json() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).expect("date");
        let item = WorkItem::from_candidate(
            "batch-1",
            date,
            &sample_candidate(),
            vec![22.5, 23.5, 24.5, 25.5, 26.5],
        );

        let json = serde_json::to_string(&item).expect("serialize");
        let back: WorkItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, item);
    }
}
