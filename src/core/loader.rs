//! Staging loader and merge-back
//!
//! Encodes transformed batches and bulk-loads them into the session's staging
//! table, then indexes and merges the staging table into the source in one
//! statement.

use super::encoder::CopyEncoder;
use super::transform::StagingRecord;
use crate::adapters::database::TableSession;
use crate::domain::Result;

/// Drives the staging table of one table run
#[derive(Debug)]
pub struct StagingLoader {
    encoder: CopyEncoder,
    rows_staged: u64,
    loads: u64,
}

impl StagingLoader {
    /// Create a loader using `encoder` for the bulk-load stream
    pub fn new(encoder: CopyEncoder) -> Self {
        Self {
            encoder,
            rows_staged: 0,
            loads: 0,
        }
    }

    /// Create the empty staging table
    pub async fn prepare(&self, session: &mut dyn TableSession) -> Result<()> {
        session.create_staging().await
    }

    /// Bulk-load one batch of records
    ///
    /// An empty batch issues no statement. Returns the number of rows loaded.
    pub async fn load(
        &mut self,
        session: &mut dyn TableSession,
        records: &[StagingRecord],
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let payload = self.encoder.payload(records);
        tracing::trace!(rows = payload.rows, bytes = payload.data.len(), "Copying batch");

        let loaded = session.copy_into_staging(payload).await?;
        self.rows_staged += loaded;
        self.loads += 1;
        Ok(loaded)
    }

    /// Index the staging table and merge it into the source
    ///
    /// Returns the number of source rows updated. Nothing is executed when no
    /// row was staged.
    pub async fn merge(&self, session: &mut dyn TableSession) -> Result<u64> {
        if self.rows_staged == 0 {
            return Ok(0);
        }

        session.create_staging_index().await?;
        session.merge_staging().await
    }

    /// Rows loaded into staging so far
    pub fn rows_staged(&self) -> u64 {
        self.rows_staged
    }

    /// Bulk-load statements issued so far
    pub fn loads(&self) -> u64 {
        self.loads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoder::{CopyPayload, DEFAULT_DELIMITER};
    use crate::domain::{Row, Value};
    use async_trait::async_trait;

    /// Session recording the statements a loader issues
    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
        payloads: Vec<String>,
    }

    #[async_trait]
    impl TableSession for Recording {
        async fn count_rows(&mut self) -> Result<u64> {
            Ok(0)
        }
        async fn open_cursor(&mut self) -> Result<()> {
            Ok(())
        }
        async fn fetch_batch(&mut self, _size: usize) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
        async fn create_staging(&mut self) -> Result<()> {
            self.calls.push("stage".to_string());
            Ok(())
        }
        async fn copy_into_staging(&mut self, payload: CopyPayload) -> Result<u64> {
            self.calls.push("copy".to_string());
            self.payloads
                .push(String::from_utf8(payload.data.to_vec()).unwrap());
            Ok(payload.rows as u64)
        }
        async fn create_staging_index(&mut self) -> Result<()> {
            self.calls.push("index".to_string());
            Ok(())
        }
        async fn merge_staging(&mut self) -> Result<u64> {
            self.calls.push("merge".to_string());
            Ok(2)
        }
        async fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        async fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn record(id: i64, value: &str) -> StagingRecord {
        StagingRecord {
            key: Value::from(id),
            values: vec![Value::from(value)],
        }
    }

    #[tokio::test]
    async fn test_load_and_merge() {
        let mut session = Recording::default();
        let mut loader = StagingLoader::new(CopyEncoder::new(DEFAULT_DELIMITER).unwrap());

        loader.prepare(&mut session).await.unwrap();
        assert_eq!(loader.load(&mut session, &[]).await.unwrap(), 0);
        assert_eq!(
            loader
                .load(&mut session, &[record(1, "a\tb"), record(2, "c")])
                .await
                .unwrap(),
            2
        );
        assert_eq!(loader.merge(&mut session).await.unwrap(), 2);

        assert_eq!(loader.rows_staged(), 2);
        assert_eq!(loader.loads(), 1);
        assert_eq!(session.calls, vec!["stage", "copy", "index", "merge"]);
        assert_eq!(session.payloads, vec!["1\x1fa\\tb\n2\x1fc\n"]);
    }

    #[tokio::test]
    async fn test_merge_skipped_without_staged_rows() {
        let mut session = Recording::default();
        let loader = StagingLoader::new(CopyEncoder::new(DEFAULT_DELIMITER).unwrap());

        assert_eq!(loader.merge(&mut session).await.unwrap(), 0);
        assert!(session.calls.is_empty());
    }
}
