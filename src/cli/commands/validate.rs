//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the bqextract configuration file.

use crate::config::ExtractConfig;
use crate::core::context::{BatchStrategy, OutputStrategy, RunContext, SourceRef};
use crate::domain::Result;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command against the configuration loaded from `config_path`
    pub async fn execute(
        &self,
        config_path: &str,
        loaded: Result<ExtractConfig>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match loaded {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        match RunContext::resolve(&config.extract) {
            Ok(context) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Billing Project: {}", context.billing_project);
                println!("  Source: {}", describe_source(&context.source));
                println!(
                    "  Staging Table: {}",
                    context
                        .staging_table
                        .as_ref()
                        .map(|t| t.as_str())
                        .unwrap_or("none")
                );
                if let Some(limit) = context.limit {
                    println!("  Limit: {limit}");
                }
                println!("  Batching: {}", describe_batching(&context.batching));
                match &context.output {
                    OutputStrategy::LocalRecords { convert_to_string } => {
                        println!("  Output: local records");
                        println!("  Stringify Values: {convert_to_string}");
                    }
                    OutputStrategy::DirectExport { uri_prefix } => {
                        println!("  Output: direct export to {uri_prefix}");
                    }
                }
                println!("  Filename Pattern: {}", context.filename_pattern);
                println!("  Warehouse Endpoint: {}", config.warehouse.endpoint);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(2)
            }
        }
    }
}

fn describe_source(source: &SourceRef) -> String {
    match source {
        SourceRef::Table(table) => format!("table {}", table.as_str()),
        SourceRef::View(view) => format!("view {}", view.as_str()),
        SourceRef::Query(_) => "query".to_string(),
    }
}

fn describe_batching(batching: &BatchStrategy) -> String {
    match batching {
        BatchStrategy::Unbatched => "none".to_string(),
        BatchStrategy::Column { column } => format!("by column {}", column.as_str()),
        BatchStrategy::Shard {
            max_batch_size,
            hash_columns,
        } => {
            let names: Vec<&str> = hash_columns.iter().map(|c| c.as_str()).collect();
            format!(
                "hash shards of at most {max_batch_size} rows over {}",
                names.join(", ")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_validate_valid_config() {
        let file = config_file(
            r#"
[extract]
billingProject = "billing"
inputTable = "proj.ds.orders"
filenamePattern = "orders-{batch}.jsonl"
batchColumn = "month"
"#,
        );
        let path = file.path().to_str().unwrap();
        let code = ValidateArgs {}
            .execute(path, load_config(path))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_validate_contradictory_config() {
        let file = config_file(
            r#"
[extract]
billingProject = "billing"
inputTable = "proj.ds.orders"
inputView = "proj.ds.orders_view"
filenamePattern = "orders.jsonl"
"#,
        );
        let path = file.path().to_str().unwrap();
        let code = ValidateArgs {}
            .execute(path, load_config(path))
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn test_describe_batching() {
        assert_eq!(describe_batching(&BatchStrategy::Unbatched), "none");
    }
}
