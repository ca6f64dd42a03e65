//! Export command implementation
//!
//! This module implements the `export` command: stage, plan and export the
//! configured source, then write the termination manifest.

use crate::adapters::bigquery::BigQueryClient;
use crate::adapters::sink::JsonLinesSink;
use crate::config::ExtractConfig;
use crate::core::context::RunContext;
use crate::core::coordinator::ExtractCoordinator;
use crate::core::export::{ExtractSummary, OutputKind};
use crate::core::manifest::DEFAULT_TERMINATION_LOG;
use crate::domain::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Directory that receives local record files
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Where the batch manifest of a batched run is written
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TERMINATION_LOG)]
    pub termination_log: PathBuf,
}

impl ExportArgs {
    /// Execute the export command against the configuration loaded from `config_path`
    pub async fn execute(
        &self,
        config_path: &str,
        loaded: Result<ExtractConfig>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting export command");

        let config = match loaded {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(e.exit_code());
            }
        };

        let context = match RunContext::resolve(&config.extract) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration validation failed");
                eprintln!("Configuration validation failed: {e}");
                return Ok(e.exit_code());
            }
        };

        let client = match BigQueryClient::new(&config.warehouse, &context.billing_project) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create warehouse client");
                eprintln!("Failed to initialize warehouse client: {e}");
                return Ok(e.exit_code());
            }
        };

        let sink = JsonLinesSink::new(&self.output);
        let coordinator = ExtractCoordinator::new(
            context,
            Arc::new(client),
            Arc::new(sink),
            &self.termination_log,
        );

        println!("🚀 Starting extraction...");
        println!();

        let summary = match coordinator.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, exit_code = e.exit_code(), "Extraction failed");
                eprintln!("Extraction failed: {e}");
                return Ok(e.exit_code());
            }
        };

        print_summary(&summary, &self.termination_log);
        println!("✅ Extraction completed successfully!");
        Ok(0)
    }
}

fn print_summary(summary: &ExtractSummary, termination_log: &std::path::Path) {
    println!("📊 Extraction Summary:");
    match summary.output {
        OutputKind::LocalRecords => println!("  Output: local records"),
        OutputKind::DirectExport => println!("  Output: direct export"),
    }
    println!("  Staged: {}", if summary.staged { "yes" } else { "no" });
    if summary.batched {
        println!("  Batches: {}", summary.batches.len());
        println!("  Manifest: {}", termination_log.display());
    } else {
        println!("  Batches: none (unbatched)");
    }
    if let Some(total) = summary.total_rows {
        println!("  Total Rows: {total}");
    }
    if let Some(max) = summary.max_batch_rows {
        println!("  Largest Batch: {max} rows");
    }
    println!("  Destinations: {}", summary.destinations.len());
    for destination in summary.destinations.iter().take(10) {
        println!("    - {destination}");
    }
    if summary.destinations.len() > 10 {
        println!("    ... and {} more", summary.destinations.len() - 10);
    }
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}
