//! Outcome reporting for finalized batches.
//!
//! Sinks receive the final [`BatchOutcome`] exactly once per run. The
//! coordinator logs and swallows sink errors, so a broken sink never
//! changes a batch disposition.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::coordinator::BatchOutcome;
use crate::error::BatchResult;

/// Current report schema version.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// One line of a batch report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Report schema version.
    pub schema_version: u32,
    /// Batch identifier for correlation.
    pub batch_id: String,
    /// Timestamp when the record was captured.
    pub recorded_at: DateTime<Utc>,
    /// Type of record stored (e.g. "outcome", "missing").
    pub kind: String,
    /// Arbitrary JSON payload describing the record.
    pub payload: Value,
}

impl ReportRecord {
    /// Create a new report record with the current timestamp.
    pub fn new(batch_id: impl Into<String>, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            batch_id: batch_id.into(),
            recorded_at: Utc::now(),
            kind: kind.into(),
            payload,
        }
    }
}

/// Destination for finalized batch outcomes.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Record the outcome of a finalized batch.
    async fn report(&self, outcome: &BatchOutcome) -> BatchResult<()>;
}

/// Sink that emits the outcome to the tracing log and nothing else.
#[derive(Debug, Default, Clone)]
pub struct LogReportSink;

#[async_trait]
impl ReportSink for LogReportSink {
    async fn report(&self, outcome: &BatchOutcome) -> BatchResult<()> {
        info!(
            batch_id = %outcome.batch_id,
            disposition = outcome.disposition.as_label(),
            expected = outcome.summary.expected,
            completed = outcome.summary.completed,
            failed = outcome.summary.failed,
            "batch finalized"
        );
        if !outcome.missing.is_empty() {
            warn!(
                batch_id = %outcome.batch_id,
                missing = outcome.missing.len(),
                "entities unaccounted for at finalization"
            );
        }
        Ok(())
    }
}

/// Sink that writes one JSONL report file per batch.
///
/// Records land in a temporary file first and move into place with a
/// rename, so readers never observe a partially written report.
#[derive(Debug, Clone)]
pub struct JsonlReportSink {
    reports_dir: PathBuf,
}

impl JsonlReportSink {
    /// Create a sink rooted at the given reports directory.
    pub fn new(reports_dir: impl Into<PathBuf>) -> BatchResult<Self> {
        let reports_dir = reports_dir.into();
        fs::create_dir_all(&reports_dir)?;
        Ok(Self { reports_dir })
    }

    /// Path of the report file for a batch.
    pub fn report_path(&self, batch_id: &str) -> PathBuf {
        self.reports_dir.join(format!("{}.jsonl", batch_id))
    }

    /// Get the reports directory path.
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn build_records(outcome: &BatchOutcome) -> BatchResult<Vec<ReportRecord>> {
        let mut records = Vec::with_capacity(1 + outcome.missing.len() + outcome.failures.len());
        records.push(ReportRecord::new(
            &outcome.batch_id,
            "outcome",
            json!({
                "slate_date": outcome.slate_date,
                "disposition": outcome.disposition.as_label(),
                "summary": serde_json::to_value(&outcome.summary)?,
            }),
        ));
        for entity_key in &outcome.missing {
            records.push(ReportRecord::new(
                &outcome.batch_id,
                "missing",
                json!({ "entity_key": entity_key }),
            ));
        }
        for failure in &outcome.failures {
            records.push(ReportRecord::new(
                &outcome.batch_id,
                "failure",
                json!({ "entity_key": failure.entity_key, "reason": failure.reason }),
            ));
        }
        Ok(records)
    }
}

#[async_trait]
impl ReportSink for JsonlReportSink {
    async fn report(&self, outcome: &BatchOutcome) -> BatchResult<()> {
        let records = Self::build_records(outcome)?;

        let temp_path = self
            .reports_dir
            .join(format!("{}.jsonl.tmp", outcome.batch_id));
        let final_path = self.report_path(&outcome.batch_id);

        let mut file = fs::File::create(&temp_path)?;
        for record in &records {
            let json = serde_json::to_string(record)?;
            writeln!(file, "{}", json)?;
        }
        file.sync_all()?;
        fs::rename(&temp_path, &final_path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::BatchDisposition;
    use crate::progress::{BatchSummary, FailureRecord};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_outcome() -> BatchOutcome {
        BatchOutcome {
            batch_id: "batch-42-7".to_string(),
            slate_date: NaiveDate::from_ymd_opt(2025, 11, 8).expect("date"),
            disposition: BatchDisposition::Stalled,
            summary: BatchSummary {
                expected: 4,
                completed: 2,
                failed: 1,
                total_sub_results: 8,
                avg_sub_results_per_entity: 4.0,
                success_rate: 50.0,
                started_at: Utc::now(),
                completed_at: None,
                elapsed: Duration::from_secs(130),
                p50_ms: 900,
                p95_ms: 1200,
                p99_ms: 1200,
            },
            missing: vec!["player-003".to_string()],
            failures: vec![FailureRecord {
                entity_key: "player-002".to_string(),
                reason: "model blew up".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_jsonl_sink_writes_report_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let sink = JsonlReportSink::new(temp_dir.path()).expect("sink");
        let outcome = sample_outcome();

        sink.report(&outcome).await.expect("report");

        let path = sink.report_path("batch-42-7");
        assert!(path.exists());

        let content = fs::read_to_string(&path).expect("read");
        let first: ReportRecord =
            serde_json::from_str(content.lines().next().expect("line")).expect("record");
        assert_eq!(first.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(first.batch_id, "batch-42-7");
        assert_eq!(first.kind, "outcome");
        assert_eq!(first.payload["disposition"], "stalled");
    }

    #[tokio::test]
    async fn test_jsonl_sink_records_missing_and_failures() {
        let temp_dir = TempDir::new().expect("temp dir");
        let sink = JsonlReportSink::new(temp_dir.path()).expect("sink");
        let outcome = sample_outcome();

        sink.report(&outcome).await.expect("report");

        let content = fs::read_to_string(sink.report_path("batch-42-7")).expect("read");
        let kinds: Vec<String> = content
            .lines()
            .map(|line| {
                let record: ReportRecord = serde_json::from_str(line).expect("record");
                record.kind
            })
            .collect();
        assert_eq!(kinds, vec!["outcome", "missing", "failure"]);
    }

    #[tokio::test]
    async fn test_jsonl_sink_leaves_no_temp_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let sink = JsonlReportSink::new(temp_dir.path()).expect("sink");

        sink.report(&sample_outcome()).await.expect("report");

        assert!(!temp_dir.path().join("batch-42-7.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn test_log_sink_accepts_outcome() {
        let sink = LogReportSink;
        sink.report(&sample_outcome()).await.expect("report");
    }

    #[test]
    fn test_report_record_carries_schema_version() {
        let record = ReportRecord::new("batch-1", "outcome", json!({"ok": true}));
        assert_eq!(record.schema_version, REPORT_SCHEMA_VERSION);
        assert_eq!(record.kind, "outcome");
    }
}
