//! Validate config command implementation
//!
//! This module implements the `validate-config` command. Besides the file
//! itself it resolves every provider and compiles every exclude pattern, so
//! everything that would fail before row I/O fails here too.

use crate::config::{load_config, redact_connection_string};
use crate::core::plan::build_plans;
use crate::providers::ProviderRegistry;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let registry = ProviderRegistry::with_builtins();
        let plans = match build_plans(&config.tables, &registry) {
            Ok(plans) => {
                println!("✅ Providers and exclude patterns are valid");
                plans
            }
            Err(e) => {
                println!("❌ Table definitions are invalid");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!(
            "  PostgreSQL Connection: {}",
            redact_connection_string(&config.postgresql.connection_string)
        );
        println!("  SSL Mode: {}", config.postgresql.ssl_mode);
        println!("  Workers: {}", config.anonymization.workers);
        println!("  Continue On Error: {}", config.anonymization.continue_on_error);
        if !config.anonymization.truncate.is_empty() {
            println!("  Truncate: {}", config.anonymization.truncate.join(", "));
        }
        if let Some(dump_file) = &config.anonymization.dump_file {
            println!("  Dump File: {dump_file}");
        }
        println!("  Tables:");
        for plan in &plans {
            println!(
                "    - {} (key: {}, chunk size: {}, columns: {}, excludes: {}{})",
                plan.table(),
                plan.shape.primary_key,
                plan.chunk_size,
                plan.shape.rule_columns.join(", "),
                plan.excludes.rules().len(),
                if plan.shape.search.is_some() {
                    ", filtered"
                } else {
                    ""
                }
            );
        }
        println!();
        Ok(0)
    }
}
