//! Result type alias for pganon

use super::errors::AnonymizerError;

/// Result type alias for pganon operations
///
/// # Examples
///
/// ```
/// use pganon::domain::result::Result;
/// use pganon::domain::errors::AnonymizerError;
///
/// fn failing_function() -> Result<()> {
///     Err(AnonymizerError::Configuration("missing primary key".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AnonymizerError>;
