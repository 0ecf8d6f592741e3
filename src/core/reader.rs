//! Chunked streaming reader
//!
//! Pulls fixed-size batches from a session's cursor. An empty fetch is the
//! only exhaustion signal: a short batch may still be followed by more rows.

use crate::adapters::database::TableSession;
use crate::domain::{Result, Row};

/// Reads one table's cursor batch by batch
#[derive(Debug)]
pub struct ChunkedReader {
    chunk_size: usize,
    fetches: u64,
    rows_read: u64,
    exhausted: bool,
}

impl ChunkedReader {
    /// Create a reader fetching `chunk_size` rows per round trip
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            fetches: 0,
            rows_read: 0,
            exhausted: false,
        }
    }

    /// Fetch the next batch
    ///
    /// Returns `None` once the cursor has returned an empty batch; later calls
    /// do not touch the session again.
    pub async fn next_batch(&mut self, session: &mut dyn TableSession) -> Result<Option<Vec<Row>>> {
        if self.exhausted {
            return Ok(None);
        }

        let rows = session.fetch_batch(self.chunk_size).await?;
        self.fetches += 1;

        if rows.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.rows_read += rows.len() as u64;
        Ok(Some(rows))
    }

    /// Fetch round trips issued so far, including the final empty one
    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    /// Rows returned so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Rows requested per fetch
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
