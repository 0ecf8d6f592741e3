//! Anonymization summary and reporting
//!
//! This module defines structures for tracking and reporting run results.

use crate::domain::{AnonymizerError, ErrorKind};
use std::time::Duration;

/// Failure recorded for a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableFailure {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Error message
    pub message: String,
}

impl From<&AnonymizerError> for TableFailure {
    fn from(error: &AnonymizerError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Result of anonymizing one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSummary {
    /// Table name
    pub table: String,

    /// Rows matching the search condition when the run started
    pub rows_total: u64,

    /// Rows read from the cursor
    pub rows_fetched: u64,

    /// Rows skipped by exclude rules
    pub rows_excluded: u64,

    /// Rows without any transformable value
    pub rows_unchanged: u64,

    /// Rows written to the staging table
    pub rows_staged: u64,

    /// Source rows updated by the merge
    pub rows_merged: u64,

    /// Non-empty batches processed
    pub batches: u64,

    /// Fetch round trips, including the final empty one
    pub fetches: u64,

    /// Whether the changes were rolled back on purpose
    pub dry_run: bool,

    /// Duration of the table run
    pub duration: Duration,

    /// Error that aborted the table, if any
    pub error: Option<TableFailure>,
}

impl TableSummary {
    /// Create an empty summary for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// True when the table was processed without error
    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of an anonymization run
#[derive(Debug, Clone, Default)]
pub struct AnonymizationSummary {
    /// One entry per table attempted, in processing order
    pub tables: Vec<TableSummary>,

    /// Tables not started because the run was cancelled
    pub skipped: Vec<String>,

    /// Duration of the run
    pub duration: Duration,
}

impl AnonymizationSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a finished or failed table
    pub fn add_table(&mut self, table: TableSummary) {
        self.tables.push(table);
    }

    /// Tables that failed
    pub fn failed_tables(&self) -> impl Iterator<Item = &TableSummary> {
        self.tables.iter().filter(|t| !t.is_successful())
    }

    /// Check if every attempted table succeeded and none was skipped
    pub fn is_successful(&self) -> bool {
        self.skipped.is_empty() && self.tables.iter().all(TableSummary::is_successful)
    }

    /// Whether the run stopped because of a shutdown signal
    pub fn was_cancelled(&self) -> bool {
        self.tables
            .iter()
            .any(|t| matches!(&t.error, Some(f) if f.kind == ErrorKind::Cancelled))
    }

    /// Total number of source rows updated
    pub fn rows_merged(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_merged).sum()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            tables = self.tables.len(),
            failed = self.failed_tables().count(),
            skipped = self.skipped.len(),
            rows_merged = self.rows_merged(),
            duration_secs = self.duration.as_secs(),
            "Anonymization completed"
        );

        for table in &self.tables {
            match &table.error {
                None => tracing::info!(
                    table = %table.table,
                    rows_total = table.rows_total,
                    rows_fetched = table.rows_fetched,
                    rows_excluded = table.rows_excluded,
                    rows_unchanged = table.rows_unchanged,
                    rows_staged = table.rows_staged,
                    rows_merged = table.rows_merged,
                    batches = table.batches,
                    dry_run = table.dry_run,
                    duration_ms = table.duration.as_millis() as u64,
                    "Table summary"
                ),
                Some(failure) => tracing::warn!(
                    table = %table.table,
                    kind = ?failure.kind,
                    message = %failure.message,
                    "Table failed"
                ),
            }
        }

        if !self.skipped.is_empty() {
            tracing::warn!(tables = %self.skipped.join(", "), "Tables skipped");
        }
    }
}
