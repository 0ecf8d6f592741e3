//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output
//! - Configurable log levels, overridable with `RUST_LOG`
//! - JSON log files with rotation
//!
//! # Example
//!
//! ```no_run
//! use pganon::logging::init_logging;
//! use pganon::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "auth_user", "Anonymizing table");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a table
///
/// # Example
///
/// ```no_run
/// use pganon::log_table_start;
///
/// log_table_start!("auth_user", 12_000u64, 6u64);
/// ```
#[macro_export]
macro_rules! log_table_start {
    ($table:expr, $total_rows:expr, $batches:expr) => {
        tracing::info!(
            table = %$table,
            total_rows = $total_rows,
            estimated_batches = $batches,
            "Anonymizing table"
        );
    };
}

/// Log one processed batch
///
/// # Example
///
/// ```no_run
/// use pganon::log_batch_processing;
///
/// log_batch_processing!("auth_user", 3u64, 6u64);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($table:expr, $current:expr, $total:expr) => {
        tracing::debug!(
            table = %$table,
            batch = $current,
            batches = $total,
            progress_pct = if $total == 0 {
                100.0
            } else {
                $current as f64 / $total as f64 * 100.0
            },
            "Processed batch"
        );
    };
}

/// Log the completion of a table
///
/// # Example
///
/// ```no_run
/// use pganon::log_table_complete;
/// use std::time::Duration;
///
/// log_table_complete!("auth_user", 11_950u64, Duration::from_secs(4));
/// ```
#[macro_export]
macro_rules! log_table_complete {
    ($table:expr, $merged:expr, $duration:expr) => {
        tracing::info!(
            table = %$table,
            rows_merged = $merged,
            duration_ms = $duration.as_millis() as u64,
            "Table anonymized"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use pganon::log_error_with_context;
/// use pganon::domain::AnonymizerError;
///
/// let error = AnonymizerError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
