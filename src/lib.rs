// pganon - PostgreSQL column anonymizer
// Copyright (c) 2025 pganon Contributors
// Licensed under the MIT License

//! # pganon - PostgreSQL column anonymizer
//!
//! pganon replaces sensitive column values of PostgreSQL tables in place, for
//! example to turn a production copy into a database developers can use.
//!
//! ## Overview
//!
//! For every configured table the library:
//! - **Reads** rows in fixed-size batches through a server-side cursor
//! - **Filters** out rows matched by exclude patterns
//! - **Transforms** rule columns with pluggable providers, in parallel
//! - **Stages** each batch with `COPY ... FROM STDIN` into a temporary table
//! - **Merges** the staging table back with a single `UPDATE ... FROM`
//!
//! Each table runs in its own transaction: it is either fully anonymized or
//! left untouched.
//!
//! ## Architecture
//!
//! pganon follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - The anonymization pipeline
//! - [`providers`] - Value providers and their registry
//! - [`adapters`] - Database seam and the PostgreSQL implementation
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pganon::adapters::postgresql::PostgreSQLClient;
//! use pganon::config::load_config;
//! use pganon::core::orchestrator::{Anonymizer, AnonymizerOptions};
//! use pganon::providers::ProviderRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("pganon.toml")?;
//!
//!     let client = PostgreSQLClient::new(config.postgresql.clone())?;
//!     let mut store = client.store().await?;
//!
//!     let anonymizer = Anonymizer::new(
//!         ProviderRegistry::with_builtins(),
//!         AnonymizerOptions::default(),
//!     )?;
//!     let summary = anonymizer.run(&mut store, &config.tables).await?;
//!
//!     println!("Anonymized {} rows", summary.rows_merged());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Providers
//!
//! ```rust
//! use pganon::domain::{Result, Value};
//! use pganon::providers::{Provider, ProviderRegistry};
//! use std::sync::Arc;
//!
//! struct Initials;
//!
//! impl Provider for Initials {
//!     fn name(&self) -> &str {
//!         "initials"
//!     }
//!
//!     fn alter(&self, value: &Value) -> Result<Value> {
//!         let text = value.text_form().unwrap_or_default();
//!         Ok(Value::from(text.chars().take(1).collect::<String>()))
//!     }
//! }
//!
//! let mut registry = ProviderRegistry::with_builtins();
//! registry.register("initials", |_| Ok(Arc::new(Initials) as Arc<dyn Provider>));
//! assert!(registry.contains("initials"));
//! ```
//!
//! ## Error Handling
//!
//! All errors are [`domain::AnonymizerError`]. Data problems, such as a value
//! the bulk loader rejects, are kept apart from connectivity problems:
//!
//! ```rust
//! use pganon::domain::AnonymizerError;
//!
//! let error = AnonymizerError::BadDataFormat {
//!     table: "auth_user".to_string(),
//!     message: "invalid input syntax for type integer".to_string(),
//! };
//! assert!(error.is_data_error());
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod providers;
