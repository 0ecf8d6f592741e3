//! Anonymize command implementation
//!
//! This module implements the `anonymize` command: optional truncation, the
//! table pipeline, and an optional dump of the anonymized database.

use crate::adapters::postgresql::{create_database_dump, PostgreSQLClient};
use crate::config::{load_config, redact_connection_string, AnonymizerConfig};
use crate::core::orchestrator::{Anonymizer, AnonymizerOptions};
use crate::core::summary::AnonymizationSummary;
use crate::domain::{AnonymizerError, TableDefinition};
use crate::providers::ProviderRegistry;
use clap::Args;
use std::path::Path;
use tokio::sync::watch;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - read and transform, then roll every table back
    #[arg(long)]
    pub dry_run: bool,

    /// Only anonymize these tables (comma-separated)
    #[arg(long)]
    pub table: Option<String>,

    /// Write a compressed pg_dump archive here afterwards
    #[arg(long, value_name = "PATH")]
    pub dump_file: Option<String>,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting anonymize command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        if let Some(path) = &self.dump_file {
            tracing::info!(path = %path, "Overriding dump file from CLI");
            config.anonymization.dump_file = Some(path.clone());
        }

        let tables = match &self.table {
            Some(names) => {
                let names: Vec<String> = names
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                tracing::info!(tables = ?names, "Selecting tables from CLI");
                match config.select_tables(&names) {
                    Ok(tables) => tables,
                    Err(e) => {
                        eprintln!("Invalid table selection: {e}");
                        return Ok(2);
                    }
                }
            }
            None => config.tables.clone(),
        };

        let options = match anonymizer_options(&config) {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        };
        let dry_run = options.dry_run;

        let anonymizer = Anonymizer::new(ProviderRegistry::with_builtins(), options)?
            .with_shutdown(shutdown_signal);

        // Resolve providers and exclude patterns before connecting
        if let Err(e) = anonymizer.plan(&tables) {
            tracing::error!(error = %e, "Invalid table definitions");
            eprintln!("Invalid table definitions: {e}");
            return Ok(2);
        }

        if dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - Every table will be rolled back");
            println!();
        }

        if !self.yes && !dry_run && !confirm(&config, &tables_label(&tables))? {
            println!("Anonymization cancelled.");
            return Ok(0);
        }

        let client = match PostgreSQLClient::new(config.postgresql.clone()) {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Failed to initialize database client: {e}");
                return Ok(4); // Connection error exit code
            }
        };
        if let Err(e) = client.test_connection().await {
            tracing::error!(error = %e, "PostgreSQL connection test failed");
            eprintln!("Failed to connect to {}: {e}", client.connection_string_safe());
            return Ok(4);
        }
        let mut store = match client.store().await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                eprintln!("Failed to connect to {}: {e}", client.connection_string_safe());
                return Ok(4);
            }
        };

        if !config.anonymization.truncate.is_empty() {
            if dry_run {
                tracing::info!(
                    tables = %config.anonymization.truncate.join(", "),
                    "Dry run, skipping truncation"
                );
            } else if let Err(e) = store.truncate_tables(&config.anonymization.truncate).await {
                eprintln!("Truncation failed: {e}");
                return Ok(exit_code_for(&e));
            }
        }

        println!("🚀 Starting anonymization...");
        println!();

        let summary = match anonymizer.run(&mut store, &tables).await {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Anonymization aborted");
                eprintln!("Anonymization failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        summary.log_summary();
        print_summary(&summary);

        if summary.was_cancelled() {
            println!("⚠️  Anonymization interrupted. The interrupted table was rolled back.");
            return Ok(130); // SIGINT exit code (standard Unix convention)
        }

        if let Some(path) = &config.anonymization.dump_file {
            if dry_run {
                tracing::info!(path = %path, "Dry run, skipping dump");
            } else if let Err(e) = create_database_dump(Path::new(path), &config.postgresql).await {
                crate::log_error_with_context!(&e, "Database dump failed");
                eprintln!("Database dump failed: {e}");
                return Ok(5);
            } else {
                println!("💾 Dump written to {path}");
            }
        }

        let exit_code = if summary.is_successful() {
            println!("✅ Anonymization completed successfully!");
            0
        } else {
            println!("⚠️  Anonymization completed with failures");
            1 // Partial success
        };

        Ok(exit_code)
    }
}

fn anonymizer_options(config: &AnonymizerConfig) -> Result<AnonymizerOptions, String> {
    Ok(AnonymizerOptions {
        workers: config.anonymization.workers,
        dry_run: config.application.dry_run,
        delimiter: config.anonymization.delimiter_char()?,
        continue_on_error: config.anonymization.continue_on_error,
    })
}

fn tables_label(tables: &[TableDefinition]) -> String {
    tables
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn confirm(config: &AnonymizerConfig, tables: &str) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    println!("Anonymization Configuration:");
    println!(
        "  Database: {}",
        redact_connection_string(&config.postgresql.connection_string)
    );
    println!("  Tables: {tables}");
    if !config.anonymization.truncate.is_empty() {
        println!("  Truncate: {}", config.anonymization.truncate.join(", "));
    }
    println!("  Workers: {}", config.anonymization.workers);
    println!();
    println!("Rows are modified in place and cannot be restored.");
    print!("Proceed with anonymization? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn exit_code_for(error: &AnonymizerError) -> i32 {
    if error.is_configuration_error() {
        2
    } else {
        5
    }
}

fn print_summary(summary: &AnonymizationSummary) {
    println!();
    println!("📊 Anonymization Summary:");
    for table in &summary.tables {
        match &table.error {
            None => println!(
                "  {}: {} fetched, {} excluded, {} staged, {} merged ({:.2}s)",
                table.table,
                table.rows_fetched,
                table.rows_excluded,
                table.rows_staged,
                table.rows_merged,
                table.duration.as_secs_f64()
            ),
            Some(failure) => println!(
                "  {}: FAILED ({:?}) {}",
                table.table, failure.kind, failure.message
            ),
        }
    }
    if !summary.skipped.is_empty() {
        println!("  Skipped: {}", summary.skipped.join(", "));
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}
