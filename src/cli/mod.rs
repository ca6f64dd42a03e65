//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for bqextract using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// bqextract - batched BigQuery extraction
#[derive(Parser, Debug)]
#[command(name = "bqextract")]
#[command(version, about, long_about = None)]
#[command(author = "bqextract Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "bqextract.toml", env = "BQEXTRACT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "BQEXTRACT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stage, plan and export the configured source
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
