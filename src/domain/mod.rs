//! Domain models and types for pganon.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Column values and rows** ([`Value`], [`Row`])
//! - **Table definitions** ([`TableDefinition`], [`ColumnRule`], [`ExcludeRule`])
//! - **Error types** ([`AnonymizerError`])
//! - **Result type alias** ([`Result`])
//!
//! # Builder Pattern
//!
//! Table definitions are usually deserialized from the configuration file, but
//! can also be assembled in code:
//!
//! ```rust
//! use pganon::domain::{ProviderConfig, TableDefinition};
//!
//! let users = TableDefinition::new("users")
//!     .field_with_append("email", ProviderConfig::named("md5"), "@localhost")
//!     .exclude("email", &[r"\S.*@example\.com"])
//!     .chunk_size(5000);
//!
//! assert!(users.validate().is_ok());
//! ```

pub mod errors;
pub mod result;
pub mod table;
pub mod value;

// Re-export commonly used types for convenience
pub use errors::{AnonymizerError, ErrorKind};
pub use result::Result;
pub use table::{
    ColumnRule, ExcludeRule, ProviderConfig, TableDefinition, DEFAULT_CHUNK_SIZE,
    DEFAULT_PRIMARY_KEY,
};
pub use value::{Row, Value};
