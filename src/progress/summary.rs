//! Finalized batch summaries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable summary frozen out of the progress state at finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Number of entities the batch expected to account for.
    pub expected: usize,
    /// Entities that completed.
    pub completed: usize,
    /// Entities that failed.
    pub failed: usize,
    /// Total sub-results across all completions.
    pub total_sub_results: u64,
    /// Average sub-results per completed entity.
    pub avg_sub_results_per_entity: f64,
    /// Completed share of expected, as a percentage.
    pub success_rate: f64,
    /// Wall-clock batch start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time accounting closed, if it did.
    pub completed_at: Option<DateTime<Utc>>,
    /// Elapsed duration from start to close, or to the summary call when
    /// accounting never closed.
    pub elapsed: Duration,
    /// Median completion arrival offset from batch start.
    pub p50_ms: u64,
    /// 95th percentile completion arrival offset.
    pub p95_ms: u64,
    /// 99th percentile completion arrival offset.
    pub p99_ms: u64,
}

impl BatchSummary {
    /// Format as a human-readable block.
    pub fn format_table(&self) -> String {
        let mut output = String::from("## Batch Summary\n\n");

        output.push_str(&format!("**Expected**: {}\n", self.expected));
        output.push_str(&format!(
            "**Completed**: {} ({:.1}%)\n",
            self.completed, self.success_rate
        ));
        output.push_str(&format!("**Failed**: {}\n", self.failed));
        output.push_str(&format!(
            "**Sub-results**: {} ({:.1} avg per entity)\n",
            self.total_sub_results, self.avg_sub_results_per_entity
        ));
        output.push_str(&format!(
            "**Elapsed**: {:.2}s\n",
            self.elapsed.as_secs_f64()
        ));

        if self.completed > 0 {
            output.push_str(&format!(
                "**Completion times**: p50 {}ms, p95 {}ms, p99 {}ms\n",
                self.p50_ms, self.p95_ms, self.p99_ms
            ));
        }

        output
    }
}

/// Nearest-rank percentile over millisecond offsets.
///
/// Sorts in place. With fewer samples than the rank needs, the largest
/// observed value is returned rather than an error; an empty slice yields
/// zero.
pub(crate) fn percentile_ms(values: &mut [u64], percentile: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let target = ((percentile / 100.0) * values.len() as f64).ceil() as usize;
    let idx = target.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> BatchSummary {
        BatchSummary {
            expected: 10,
            completed: 8,
            failed: 2,
            total_sub_results: 40,
            avg_sub_results_per_entity: 5.0,
            success_rate: 80.0,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            elapsed: Duration::from_millis(1500),
            p50_ms: 120,
            p95_ms: 480,
            p99_ms: 900,
        }
    }

    #[test]
    fn test_percentile_empty_is_zero() {
        let mut values: Vec<u64> = Vec::new();
        assert_eq!(percentile_ms(&mut values, 50.0), 0);
    }

    #[test]
    fn test_percentile_single_sample_serves_all_ranks() {
        let mut values = vec![42];
        assert_eq!(percentile_ms(&mut values, 50.0), 42);
        assert_eq!(percentile_ms(&mut values, 95.0), 42);
        assert_eq!(percentile_ms(&mut values, 99.0), 42);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let mut values: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile_ms(&mut values, 50.0), 50);
        assert_eq!(percentile_ms(&mut values, 95.0), 95);
        assert_eq!(percentile_ms(&mut values, 99.0), 99);
    }

    #[test]
    fn test_percentile_few_samples_clamps_to_max() {
        let mut values = vec![10, 20, 30];
        assert_eq!(percentile_ms(&mut values, 99.0), 30);
    }

    #[test]
    fn test_percentile_monotonic_on_unsorted_input() {
        let mut values = vec![90, 5, 40, 70, 10, 55, 25];
        let p50 = percentile_ms(&mut values, 50.0);
        let p95 = percentile_ms(&mut values, 95.0);
        let p99 = percentile_ms(&mut values, 99.0);
        assert!(p50 <= p95);
        assert!(p95 <= p99);
    }

    #[test]
    fn test_format_table_includes_totals() {
        let formatted = sample_summary().format_table();
        assert!(formatted.contains("**Expected**: 10"));
        assert!(formatted.contains("**Completed**: 8 (80.0%)"));
        assert!(formatted.contains("p50 120ms"));
    }

    #[test]
    fn test_format_table_omits_percentiles_without_completions() {
        let mut summary = sample_summary();
        summary.completed = 0;
        let formatted = summary.format_table();
        assert!(!formatted.contains("Completion times"));
    }

    #[test]
    fn test_summary_round_trips_through_json() {
        let summary = sample_summary();
        let json = serde_json::to_string(&summary).expect("serialize");
        let back: BatchSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.completed, summary.completed);
        assert_eq!(back.p95_ms, summary.p95_ms);
    }
}
