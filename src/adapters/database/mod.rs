//! Database abstraction layer
//!
//! This module provides a trait-based abstraction for the database operations
//! of the anonymization pipeline, so the pipeline can run against PostgreSQL
//! or an in-memory store in tests.

pub mod traits;

pub use traits::{TableSession, TableStore};
