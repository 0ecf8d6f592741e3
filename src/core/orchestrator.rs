//! Anonymization orchestrator
//!
//! Drives the per-table pipeline: count, open cursor, create staging, then
//! fetch, filter, transform and bulk-load batch by batch, and finally index,
//! merge and commit. Tables are processed one after another on the same
//! store. Each table runs in its own unit of work, so a failed table is rolled
//! back without affecting the others.

use super::encoder::CopyEncoder;
use super::loader::StagingLoader;
use super::plan::{build_plans, TablePlan};
use super::progress::{ProgressEvent, ProgressObserver, TracingProgress};
use super::reader::ChunkedReader;
use super::summary::{AnonymizationSummary, TableFailure, TableSummary};
use super::transform::RowTransformer;
use crate::adapters::database::{TableSession, TableStore};
use crate::domain::{AnonymizerError, Result, TableDefinition};
use crate::providers::ProviderRegistry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Run-wide settings of an [`Anonymizer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizerOptions {
    /// Concurrent transformation workers per batch
    pub workers: usize,

    /// Roll every table back instead of committing
    pub dry_run: bool,

    /// Field delimiter of the bulk-load stream
    pub delimiter: char,

    /// Record a failed table and carry on with the next one
    pub continue_on_error: bool,
}

impl Default for AnonymizerOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            dry_run: false,
            delimiter: super::encoder::DEFAULT_DELIMITER,
            continue_on_error: false,
        }
    }
}

/// Anonymizes tables through a [`TableStore`]
pub struct Anonymizer {
    registry: ProviderRegistry,
    options: AnonymizerOptions,
    encoder: CopyEncoder,
    observer: Arc<dyn ProgressObserver>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Anonymizer {
    /// Create an anonymizer resolving providers from `registry`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the delimiter cannot be used in the
    /// bulk-load stream.
    pub fn new(registry: ProviderRegistry, options: AnonymizerOptions) -> Result<Self> {
        let encoder = CopyEncoder::new(options.delimiter)?;
        Ok(Self {
            registry,
            options,
            encoder,
            observer: Arc::new(TracingProgress),
            shutdown: None,
        })
    }

    /// Report progress to `observer` instead of the log
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop between batches once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Run-wide settings
    pub fn options(&self) -> &AnonymizerOptions {
        &self.options
    }

    /// Resolve every definition against the registry
    pub fn plan(&self, definitions: &[TableDefinition]) -> Result<Vec<TablePlan>> {
        build_plans(definitions, &self.registry)
    }

    /// Anonymize `definitions` in order
    ///
    /// All plans are built before the first table is touched, so unknown
    /// providers and invalid exclude patterns fail before any row I/O.
    ///
    /// A cancelled run is not an error: the interrupted table is rolled back
    /// and recorded as failed, the remaining tables are listed as skipped.
    ///
    /// # Errors
    ///
    /// Returns the first table error unless `continue_on_error` is set, in
    /// which case failures are only recorded in the summary.
    pub async fn run(
        &self,
        store: &mut dyn TableStore,
        definitions: &[TableDefinition],
    ) -> Result<AnonymizationSummary> {
        let started = Instant::now();
        let plans = self.plan(definitions)?;
        let mut summary = AnonymizationSummary::new();

        tracing::info!(
            tables = plans.len(),
            workers = self.options.workers,
            dry_run = self.options.dry_run,
            "Starting anonymization"
        );

        let mut plans = plans.into_iter().map(Arc::new);
        while let Some(plan) = plans.next() {
            if self.shutdown_requested() {
                summary.skipped.push(plan.table().to_string());
                summary
                    .skipped
                    .extend(plans.by_ref().map(|p| p.table().to_string()));
                break;
            }

            let mut table = TableSummary::new(plan.table());
            let result = self.execute_table(store, &plan, &mut table).await;
            let Err(error) = result else {
                summary.add_table(table);
                continue;
            };

            table.error = Some(TableFailure::from(&error));
            summary.add_table(table);

            if matches!(error, AnonymizerError::Cancelled(_)) {
                summary
                    .skipped
                    .extend(plans.by_ref().map(|p| p.table().to_string()));
                break;
            }
            if !self.options.continue_on_error {
                return Err(error);
            }
        }

        let summary = summary.with_duration(started.elapsed());
        Ok(summary)
    }

    /// Anonymize a single table
    ///
    /// # Errors
    ///
    /// Any error aborts the table; its unit of work is rolled back and the
    /// source is left unmodified.
    pub async fn anonymize_table(
        &self,
        store: &mut dyn TableStore,
        plan: Arc<TablePlan>,
    ) -> Result<TableSummary> {
        let mut table = TableSummary::new(plan.table());
        self.execute_table(store, &plan, &mut table).await?;
        Ok(table)
    }

    async fn execute_table(
        &self,
        store: &mut dyn TableStore,
        plan: &Arc<TablePlan>,
        summary: &mut TableSummary,
    ) -> Result<()> {
        let started = Instant::now();
        summary.dry_run = self.options.dry_run;

        let mut session = store.begin_table(plan).await?;
        let result = self.process(session.as_mut(), plan, summary).await;
        summary.duration = started.elapsed();

        let result = match result {
            Ok(()) if self.options.dry_run => session.rollback().await,
            Ok(()) => session.commit().await,
            Err(error) => {
                if let Err(rollback_error) = session.rollback().await {
                    tracing::warn!(
                        table = %plan.table(),
                        error = %rollback_error,
                        "Rollback failed"
                    );
                }
                Err(error)
            }
        };

        match &result {
            Ok(()) => self.observer.on_event(&ProgressEvent::TableCompleted {
                table: plan.table().to_string(),
                merged: summary.rows_merged,
                duration: summary.duration,
                dry_run: self.options.dry_run,
            }),
            Err(error) => self.observer.on_event(&ProgressEvent::TableFailed {
                table: plan.table().to_string(),
                kind: error.kind(),
                message: error.to_string(),
            }),
        }

        result
    }

    async fn process(
        &self,
        session: &mut dyn TableSession,
        plan: &Arc<TablePlan>,
        summary: &mut TableSummary,
    ) -> Result<()> {
        let table = plan.table();

        summary.rows_total = session.count_rows().await?;
        let estimated_batches = plan.estimated_batches(summary.rows_total);
        self.observer.on_event(&ProgressEvent::TableStarted {
            table: table.to_string(),
            total_rows: summary.rows_total,
            estimated_batches,
        });

        session.open_cursor().await?;
        let mut loader = StagingLoader::new(self.encoder);
        loader.prepare(session).await?;

        let transformer = RowTransformer::new(Arc::clone(plan), self.options.workers);
        let mut reader = ChunkedReader::new(plan.chunk_size);

        loop {
            self.check_shutdown(table)?;

            let batch = reader.next_batch(session).await;
            summary.fetches = reader.fetches();
            let Some(rows) = batch? else {
                break;
            };

            let fetched = rows.len();
            summary.rows_fetched = reader.rows_read();
            summary.batches += 1;

            let outcome = transformer.transform_batch(rows).await?;
            summary.rows_excluded += outcome.excluded as u64;
            summary.rows_unchanged += outcome.unchanged as u64;

            loader.load(session, &outcome.records).await?;
            summary.rows_staged = loader.rows_staged();

            self.observer.on_event(&ProgressEvent::BatchProcessed {
                table: table.to_string(),
                batch: summary.batches,
                estimated_batches,
                rows: fetched,
                staged: outcome.records.len(),
            });
        }

        self.check_shutdown(table)?;

        if self.options.dry_run {
            tracing::info!(
                table = %table,
                rows_staged = summary.rows_staged,
                "Dry run, skipping merge"
            );
            return Ok(());
        }

        summary.rows_merged = loader.merge(session).await?;
        if summary.rows_merged != summary.rows_staged {
            tracing::warn!(
                table = %table,
                rows_staged = summary.rows_staged,
                rows_merged = summary.rows_merged,
                "Merged row count differs from staged row count"
            );
        }

        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn check_shutdown(&self, table: &str) -> Result<()> {
        if self.shutdown_requested() {
            tracing::warn!(table = %table, "Shutdown requested, rolling back table");
            return Err(AnonymizerError::Cancelled(table.to_string()));
        }
        Ok(())
    }
}
