// bqextract - Batched BigQuery extraction tool
// Copyright (c) 2025 bqextract Contributors
// Licensed under the MIT License

use bqextract::cli::{Cli, Commands};
use bqextract::config::{load_config, ExtractConfig, LoggingConfig};
use bqextract::domain::Result;
use bqextract::log_error_with_context;
use bqextract::logging::init_logging;
use clap::Parser;
use std::process;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows [logging] when the config loads; otherwise console only.
    // Load failures are reported by the command itself.
    let loaded = load_config(&cli.config);
    let logging_config = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_else(|_| LoggingConfig::default());
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "bqextract - Batched BigQuery extraction tool"
    );

    let exit_code = match execute_command(&cli, loaded).await {
        Ok(code) => code,
        Err(e) => {
            log_error_with_context!(e, "Command execution failed");
            eprintln!("Error: {e}");
            5
        }
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, loaded: Result<ExtractConfig>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Export(args) => args.execute(&cli.config, loaded).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config, loaded).await,
    }
}
