//! Progress events
//!
//! The pipeline reports what it is doing through a [`ProgressObserver`].
//! Rendering is left to the observer; [`TracingProgress`] writes the events
//! to the log.

use crate::domain::ErrorKind;
use std::time::Duration;

/// Something noteworthy that happened while anonymizing
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A table run began
    TableStarted {
        table: String,
        total_rows: u64,
        estimated_batches: u64,
    },
    /// One batch went through filter, transform and bulk load
    BatchProcessed {
        table: String,
        batch: u64,
        estimated_batches: u64,
        rows: usize,
        staged: usize,
    },
    /// A table run finished; `merged` is zero on dry runs
    TableCompleted {
        table: String,
        merged: u64,
        duration: Duration,
        dry_run: bool,
    },
    /// A table run failed and was rolled back
    TableFailed {
        table: String,
        kind: ErrorKind,
        message: String,
    },
}

/// Receives progress events from the pipeline
pub trait ProgressObserver: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Logs progress events with `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::TableStarted {
                table,
                total_rows,
                estimated_batches,
            } => {
                crate::log_table_start!(table, *total_rows, *estimated_batches);
            }
            ProgressEvent::BatchProcessed {
                table,
                batch,
                estimated_batches,
                ..
            } => {
                crate::log_batch_processing!(table, *batch, *estimated_batches);
            }
            ProgressEvent::TableCompleted {
                table,
                merged,
                duration,
                dry_run: false,
            } => {
                crate::log_table_complete!(table, *merged, duration);
            }
            ProgressEvent::TableCompleted {
                table,
                duration,
                dry_run: true,
                ..
            } => {
                tracing::info!(
                    table = %table,
                    duration_ms = duration.as_millis() as u64,
                    "Dry run finished, changes rolled back"
                );
            }
            ProgressEvent::TableFailed {
                table,
                kind,
                message,
            } => {
                tracing::error!(table = %table, kind = ?kind, error = %message, "Table failed");
            }
        }
    }
}
