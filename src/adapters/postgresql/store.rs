//! PostgreSQL table store
//!
//! Each table is anonymized inside one transaction on a single pooled
//! connection. Rows stream through a server-side cursor, the staging table is
//! a temporary table dropped at commit, and the merge is one `UPDATE ... FROM`.

use super::decode::{decode_row, text_casts};
use super::sql;
use crate::adapters::database::traits::{TableSession, TableStore};
use crate::core::encoder::{delimiter_literal, CopyPayload};
use crate::core::plan::{TablePlan, TableShape};
use crate::domain::{AnonymizerError, Result, Row};
use async_trait::async_trait;
use futures::SinkExt;
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::Transaction;

/// [`TableStore`] backed by one pooled PostgreSQL connection
pub struct PostgresStore {
    conn: deadpool_postgres::Object,
    statement_timeout_seconds: u64,
}

impl PostgresStore {
    /// Wrap a pooled connection
    pub fn new(conn: deadpool_postgres::Object, statement_timeout_seconds: u64) -> Self {
        Self {
            conn,
            statement_timeout_seconds,
        }
    }

    /// Empty `tables` with a single `TRUNCATE` statement
    ///
    /// Does nothing for an empty list.
    pub async fn truncate_tables(&mut self, tables: &[String]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }

        tracing::info!(tables = %tables.join(", "), "Truncating tables");
        self.conn
            .batch_execute(&sql::truncate_sql(tables))
            .await
            .map_err(|e| classify_statement_error(&tables.join(", "), e))
    }
}

#[async_trait]
impl TableStore for PostgresStore {
    async fn begin_table<'a>(&'a mut self, plan: &TablePlan) -> Result<Box<dyn TableSession + 'a>> {
        let timeout_ms = self.statement_timeout_seconds * 1000;
        let client: &mut tokio_postgres::Client = &mut self.conn;
        let tx = client.transaction().await?;

        if timeout_ms > 0 {
            tx.batch_execute(&format!("SET LOCAL statement_timeout = {}", timeout_ms))
                .await?;
        }

        tracing::debug!(table = %plan.table(), "Transaction started");
        Ok(Box::new(PostgresTableSession {
            tx: Some(tx),
            shape: plan.shape.clone(),
            columns: Arc::clone(&plan.columns),
        }))
    }
}

/// Missing tables, missing columns and broken search conditions are
/// configuration mistakes, not connectivity problems.
fn classify_statement_error(table: &str, err: tokio_postgres::Error) -> AnonymizerError {
    let configuration_codes = [
        SqlState::UNDEFINED_TABLE,
        SqlState::UNDEFINED_COLUMN,
        SqlState::UNDEFINED_SCHEMA,
        SqlState::SYNTAX_ERROR,
        SqlState::UNDEFINED_FUNCTION,
    ];
    match err.code() {
        Some(code) if configuration_codes.contains(code) => AnonymizerError::Configuration(format!(
            "table '{}': {}",
            table,
            err.as_db_error()
                .map(|db| db.message().to_string())
                .unwrap_or_else(|| err.to_string())
        )),
        _ => AnonymizerError::from(err),
    }
}

/// Unit of work for one table inside a PostgreSQL transaction
pub struct PostgresTableSession<'a> {
    tx: Option<Transaction<'a>>,
    shape: TableShape,
    columns: Arc<[String]>,
}

impl<'a> PostgresTableSession<'a> {
    fn tx(&self) -> Result<&Transaction<'a>> {
        self.tx.as_ref().ok_or_else(|| {
            AnonymizerError::Connectivity(format!(
                "transaction for table '{}' is already closed",
                self.shape.table
            ))
        })
    }

    fn take_tx(&mut self) -> Result<Transaction<'a>> {
        let table = &self.shape.table;
        self.tx.take().ok_or_else(|| {
            AnonymizerError::Connectivity(format!(
                "transaction for table '{}' is already closed",
                table
            ))
        })
    }

    fn statement_error(&self, err: tokio_postgres::Error) -> AnonymizerError {
        classify_statement_error(&self.shape.table, err)
    }
}

#[async_trait]
impl<'a> TableSession for PostgresTableSession<'a> {
    async fn count_rows(&mut self) -> Result<u64> {
        let row = self
            .tx()?
            .query_one(&sql::count_sql(&self.shape), &[])
            .await
            .map_err(|e| self.statement_error(e))?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn open_cursor(&mut self) -> Result<()> {
        let tx = self.tx()?;

        // Prepare first to learn the column types, then cast what has no native mapping
        let probe = tx
            .prepare(&sql::select_sql(&self.shape, &[]))
            .await
            .map_err(|e| self.statement_error(e))?;
        let types: Vec<_> = probe.columns().iter().map(|c| c.type_().clone()).collect();
        let casts = text_casts(&types);

        let select = sql::select_sql(&self.shape, &casts);
        tracing::debug!(table = %self.shape.table, sql = %select, "Declaring cursor");
        tx.batch_execute(&sql::declare_cursor_sql(&select))
            .await
            .map_err(|e| self.statement_error(e))?;
        Ok(())
    }

    async fn fetch_batch(&mut self, size: usize) -> Result<Vec<Row>> {
        let rows = self.tx()?.query(&sql::fetch_sql(size), &[]).await?;
        rows.iter()
            .map(|row| decode_row(&self.columns, row))
            .collect()
    }

    async fn create_staging(&mut self) -> Result<()> {
        self.tx()?
            .batch_execute(&sql::create_staging_sql(&self.shape))
            .await
            .map_err(|e| self.statement_error(e))
    }

    async fn copy_into_staging(&mut self, payload: CopyPayload) -> Result<u64> {
        if payload.is_empty() {
            return Ok(0);
        }

        let statement = sql::copy_sql(&self.shape, &delimiter_literal(payload.delimiter));
        let table = self.shape.table.as_str();
        let copy_error = |e: tokio_postgres::Error| AnonymizerError::from_copy_error(table, &e);

        let sink = self
            .tx()?
            .copy_in(statement.as_str())
            .await
            .map_err(copy_error)?;
        futures::pin_mut!(sink);
        sink.send(payload.data).await.map_err(copy_error)?;
        sink.finish().await.map_err(copy_error)
    }

    async fn create_staging_index(&mut self) -> Result<()> {
        self.tx()?
            .batch_execute(&sql::staging_index_sql(&self.shape))
            .await?;
        Ok(())
    }

    async fn merge_staging(&mut self) -> Result<u64> {
        let merged = self
            .tx()?
            .execute(sql::merge_sql(&self.shape).as_str(), &[])
            .await
            .map_err(|e| AnonymizerError::from_merge_error(&self.shape.table, &e))?;
        Ok(merged)
    }

    async fn commit(&mut self) -> Result<()> {
        self.take_tx()?.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.take_tx()?.rollback().await?;
        Ok(())
    }
}
