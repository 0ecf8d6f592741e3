//! Configuration management for pganon.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! pganon uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PGANON_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation before any database work starts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pganon::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pganon.toml")?;
//!
//! for table in &config.tables {
//!     println!("{}: {} rules", table.name, table.fields.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run switch
//! - [`PostgreSQLConfig`] - Connection string, timeouts, TLS mode
//! - [`AnonymizationConfig`] - Workers, failure policy, truncation, dump file, delimiter
//! - [`LoggingConfig`] - Optional JSON log files
//! - `[[tables]]` - One [`TableDefinition`](crate::domain::TableDefinition) per table
//!
//! # Example Configuration
//!
//! ```toml
//! [postgresql]
//! connection_string = "${DATABASE_URL}"
//!
//! [anonymization]
//! workers = 4
//! truncate = ["django_session"]
//!
//! [[tables]]
//! name = "auth_user"
//! primary_key = "id"
//! chunk_size = 5000
//!
//! [[tables.fields]]
//! column = "email"
//! provider = { name = "md5" }
//! append = "@localhost"
//!
//! [[tables.excludes]]
//! column = "email"
//! patterns = ['\S.*@example\.com']
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    AnonymizationConfig, AnonymizerConfig, ApplicationConfig, LoggingConfig, PostgreSQLConfig,
};
pub use secret::{redact_connection_string, secret_string, SecretString, SecretValue};
