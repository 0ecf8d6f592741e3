//! Domain error types
//!
//! This module defines the error hierarchy for pganon. Errors are grouped by
//! what the caller can do about them: connectivity problems, rejected data,
//! bad configuration and bad exclude patterns are all distinct variants.
//! Third-party driver errors are converted at the boundary and never exposed.

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Main pganon error type
#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// Connection lost or a statement failed for reasons unrelated to data content
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The database rejected anonymized values (malformed text, type mismatch,
    /// constraint violation)
    #[error("Bad data format in table '{table}': {message}")]
    BadDataFormat { table: String, message: String },

    /// Configuration-related errors (unknown provider, missing column, invalid settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An exclude rule carries an invalid regular expression
    #[error("Invalid exclude pattern '{pattern}' for column '{column}': {message}")]
    ExcludePattern {
        column: String,
        pattern: String,
        message: String,
    },

    /// A provider failed to alter a value
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// The run was interrupted by a shutdown signal
    #[error("Anonymization of table '{0}' cancelled")]
    Cancelled(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Coarse classification of an [`AnonymizerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    BadDataFormat,
    Configuration,
    ExcludePattern,
    Provider,
    Cancelled,
    Other,
}

impl AnonymizerError {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::BadDataFormat { .. } => ErrorKind::BadDataFormat,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ExcludePattern { .. } => ErrorKind::ExcludePattern,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Serialization(_) | Self::Io(_) => ErrorKind::Other,
        }
    }

    /// True when the error was caused by the content of the data rather than the connection
    pub fn is_data_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::BadDataFormat | ErrorKind::Provider)
    }

    /// True when the error was detected before any row I/O
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::ExcludePattern
        )
    }

    /// Classify a driver error raised while bulk-loading into the staging table of `table`
    ///
    /// COPY format and text representation errors become [`AnonymizerError::BadDataFormat`],
    /// everything else stays a connectivity error.
    pub fn from_copy_error(table: &str, err: &tokio_postgres::Error) -> Self {
        match err.code() {
            Some(code) if is_data_exception(code) => Self::BadDataFormat {
                table: table.to_string(),
                message: describe_db_error(err),
            },
            _ => Self::Connectivity(describe_db_error(err)),
        }
    }

    /// Classify a driver error raised while merging the staging table into `table`
    ///
    /// Besides data exceptions, constraint violations (a NULL written into a
    /// NOT NULL column, a duplicate in a UNIQUE column, a failed CHECK) are
    /// caused by the anonymized values and become
    /// [`AnonymizerError::BadDataFormat`].
    pub fn from_merge_error(table: &str, err: &tokio_postgres::Error) -> Self {
        match err.code() {
            Some(code) if is_data_exception(code) || is_integrity_violation(code) => {
                Self::BadDataFormat {
                    table: table.to_string(),
                    message: describe_db_error(err),
                }
            }
            _ => Self::Connectivity(describe_db_error(err)),
        }
    }
}

/// SQLSTATE class 23 ("integrity constraint violation")
fn is_integrity_violation(code: &SqlState) -> bool {
    code.code().starts_with("23")
}

/// SQLSTATE class 22 ("data exception"), which covers
/// `bad_copy_file_format` and `invalid_text_representation`
fn is_data_exception(code: &SqlState) -> bool {
    *code == SqlState::BAD_COPY_FILE_FORMAT
        || *code == SqlState::INVALID_TEXT_REPRESENTATION
        || code.code().starts_with("22")
}

fn describe_db_error(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => match db.where_() {
            Some(location) => format!("{} ({})", db.message(), location),
            None => db.message().to_string(),
        },
        None => err.to_string(),
    }
}

// Conversion from tokio_postgres::Error
impl From<tokio_postgres::Error> for AnonymizerError {
    fn from(err: tokio_postgres::Error) -> Self {
        AnonymizerError::Connectivity(describe_db_error(&err))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for AnonymizerError {
    fn from(err: std::io::Error) -> Self {
        AnonymizerError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for AnonymizerError {
    fn from(err: serde_json::Error) -> Self {
        AnonymizerError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for AnonymizerError {
    fn from(err: toml::de::Error) -> Self {
        AnonymizerError::Configuration(format!("TOML parse error: {err}"))
    }
}
