//! Database abstraction traits
//!
//! This module defines the traits a database backend implements so the
//! anonymization pipeline can read, stage and merge rows without knowing the
//! concrete driver.

use crate::core::encoder::CopyPayload;
use crate::core::plan::TablePlan;
use crate::domain::{Result, Row};
use async_trait::async_trait;

/// Source of per-table units of work
///
/// A store hands out one [`TableSession`] at a time. Everything done through a
/// session becomes visible together on [`TableSession::commit`], and nothing of
/// it survives [`TableSession::rollback`] or dropping the session.
#[async_trait]
pub trait TableStore: Send {
    /// Open a unit of work for one table
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unusable or the unit of work
    /// cannot be started.
    async fn begin_table<'a>(&'a mut self, plan: &TablePlan) -> Result<Box<dyn TableSession + 'a>>;
}

/// Unit of work for anonymizing one table
///
/// The pipeline calls the operations in this order: [`count_rows`],
/// [`open_cursor`], [`create_staging`], then repeatedly [`fetch_batch`] and
/// [`copy_into_staging`], then [`create_staging_index`], [`merge_staging`] and
/// finally [`commit`] or [`rollback`].
///
/// [`count_rows`]: TableSession::count_rows
/// [`open_cursor`]: TableSession::open_cursor
/// [`create_staging`]: TableSession::create_staging
/// [`fetch_batch`]: TableSession::fetch_batch
/// [`copy_into_staging`]: TableSession::copy_into_staging
/// [`create_staging_index`]: TableSession::create_staging_index
/// [`merge_staging`]: TableSession::merge_staging
/// [`commit`]: TableSession::commit
/// [`rollback`]: TableSession::rollback
#[async_trait]
pub trait TableSession: Send {
    /// Number of rows matching the table's search condition
    async fn count_rows(&mut self) -> Result<u64>;

    /// Start streaming the fetched columns of the selected rows
    async fn open_cursor(&mut self) -> Result<()>;

    /// Fetch up to `size` rows from the cursor
    ///
    /// An empty result means the cursor is exhausted. Returned rows carry the
    /// plan's fetched column list, identifying column first.
    async fn fetch_batch(&mut self, size: usize) -> Result<Vec<Row>>;

    /// Create the empty staging table
    async fn create_staging(&mut self) -> Result<()>;

    /// Bulk-load an encoded batch into the staging table
    ///
    /// Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizerError::BadDataFormat`] when the stream is rejected
    /// by the database's parser.
    ///
    /// [`AnonymizerError::BadDataFormat`]: crate::domain::AnonymizerError::BadDataFormat
    async fn copy_into_staging(&mut self, payload: CopyPayload) -> Result<u64>;

    /// Index the staging table on the identifying column
    async fn create_staging_index(&mut self) -> Result<()>;

    /// Write staged values back to the source table in one statement
    ///
    /// Returns the number of source rows updated.
    async fn merge_staging(&mut self) -> Result<u64>;

    /// Make all changes of this unit of work visible
    async fn commit(&mut self) -> Result<()>;

    /// Discard all changes of this unit of work
    async fn rollback(&mut self) -> Result<()>;
}
