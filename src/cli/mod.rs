//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for pganon using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// pganon - PostgreSQL column anonymizer
#[derive(Parser, Debug)]
#[command(name = "pganon")]
#[command(version, about, long_about = None)]
#[command(author = "pganon Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "pganon.toml", env = "PGANON_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PGANON_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymize the configured tables in place
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Validate configuration file, providers and exclude patterns
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
