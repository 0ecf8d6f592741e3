//! External system integrations for pganon.
//!
//! - [`database`] - Database abstraction layer (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The pipeline only sees the
//! [`database::TableStore`] and [`database::TableSession`] traits.
//!
//! ```rust,no_run
//! use pganon::adapters::postgresql::PostgreSQLClient;
//! use pganon::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("pganon.toml")?;
//! let client = PostgreSQLClient::new(config.postgresql.clone())?;
//! client.test_connection().await?;
//!
//! let mut store = client.store().await?;
//! store.truncate_tables(&config.anonymization.truncate).await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod postgresql;
