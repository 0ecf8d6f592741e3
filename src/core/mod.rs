//! Core anonymization pipeline for pganon.
//!
//! # Modules
//!
//! - [`plan`] - Table definitions resolved against the provider registry
//! - [`exclude`] - Exclude rules that exempt rows from anonymization
//! - [`reader`] - Chunked streaming reads from a server-side cursor
//! - [`transform`] - Parallel row transformation
//! - [`encoder`] - `COPY` text format encoding
//! - [`loader`] - Staging table loads and the merge-back
//! - [`orchestrator`] - Per-table pipeline and run control
//! - [`progress`] - Progress events
//! - [`summary`] - Run summary
//!
//! # Table Workflow
//!
//! 1. **Plan**: Resolve providers and compile exclude patterns for every table
//! 2. **Count**: Count matching rows to estimate the number of batches
//! 3. **Read**: Fetch `chunk_size` rows at a time until an empty fetch
//! 4. **Filter and transform**: Drop excluded rows, apply providers in parallel
//! 5. **Stage**: Bulk-load each transformed batch into a temporary table
//! 6. **Merge**: Index the staging table and update the source in one statement
//! 7. **Commit**: Or roll back on error, cancellation and dry runs
//!
//! # Example
//!
//! ```rust,no_run
//! use pganon::adapters::postgresql::PostgreSQLClient;
//! use pganon::config::load_config;
//! use pganon::core::orchestrator::{Anonymizer, AnonymizerOptions};
//! use pganon::providers::ProviderRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pganon.toml")?;
//! let client = PostgreSQLClient::new(config.postgresql.clone())?;
//! let mut store = client.store().await?;
//!
//! let anonymizer = Anonymizer::new(ProviderRegistry::with_builtins(), AnonymizerOptions::default())?;
//! let summary = anonymizer.run(&mut store, &config.tables).await?;
//!
//! println!("Rows merged: {}", summary.rows_merged());
//! # Ok(())
//! # }
//! ```

pub mod encoder;
pub mod exclude;
pub mod loader;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod reader;
pub mod summary;
pub mod transform;
