//! PostgreSQL database integration
//!
//! This module implements the table store on top of `tokio-postgres` with a
//! `deadpool-postgres` connection pool.

pub mod client;
pub mod decode;
pub mod maintenance;
pub mod sql;
pub mod store;

pub use client::PostgreSQLClient;
pub use maintenance::create_database_dump;
pub use store::{PostgresStore, PostgresTableSession};
