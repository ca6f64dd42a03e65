//! Extraction summary and reporting
//!
//! This module defines the structure reporting what a run produced.

use crate::domain::BatchId;
use std::time::Duration;

/// Which output path a run used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    /// Newline-delimited records in a local directory
    LocalRecords,
    /// `EXPORT DATA` objects under a Cloud Storage prefix
    DirectExport,
}

/// Summary of an extraction run
#[derive(Debug, Clone)]
pub struct ExtractSummary {
    /// Planned batches in export order; empty for an unbatched run
    pub batches: Vec<BatchId>,

    /// Whether batching was active
    pub batched: bool,

    /// Rows written across all batches (local path only)
    pub total_rows: Option<u64>,

    /// Rows in the largest batch (local path only)
    pub max_batch_rows: Option<u64>,

    /// Filenames or URIs written, in export order
    pub destinations: Vec<String>,

    /// Output path used
    pub output: OutputKind,

    /// Whether a staging table was created (and dropped)
    pub staged: bool,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl ExtractSummary {
    /// Create a new empty summary for `output`
    pub fn new(output: OutputKind) -> Self {
        let total_rows = match output {
            OutputKind::LocalRecords => Some(0),
            OutputKind::DirectExport => None,
        };
        Self {
            batches: Vec::new(),
            batched: false,
            total_rows,
            max_batch_rows: total_rows,
            destinations: Vec::new(),
            output,
            staged: false,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record one written destination and its row count, when known
    pub fn record_output(&mut self, destination: String, rows: Option<u64>) {
        self.destinations.push(destination);
        if let Some(rows) = rows {
            self.total_rows = Some(self.total_rows.unwrap_or(0) + rows);
            self.max_batch_rows = Some(self.max_batch_rows.unwrap_or(0).max(rows));
        }
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            batched = self.batched,
            batch_count = self.batches.len(),
            destinations = self.destinations.len(),
            total_rows = self.total_rows,
            max_batch_rows = self.max_batch_rows,
            staged = self.staged,
            output = ?self.output,
            duration_ms = self.duration.as_millis() as u64,
            "Extraction completed"
        );
    }
}
