// bqextract - Batched BigQuery extraction tool
// Copyright (c) 2025 bqextract Contributors
// Licensed under the MIT License

//! # bqextract - Batched BigQuery extraction
//!
//! bqextract reads a BigQuery table, view or query and writes its rows either
//! as newline-delimited JSON files or, through `EXPORT DATA`, straight to
//! Cloud Storage. Large sources are split into batches, by the distinct values
//! of a column or by hash shards sized from the source row count.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Run context, SQL generation, planning, export and orchestration
//! - [`adapters`] - Warehouse client and record sinks
//! - [`domain`] - Identifiers, batch ids and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bqextract::adapters::bigquery::BigQueryClient;
//! use bqextract::adapters::sink::JsonLinesSink;
//! use bqextract::config::load_config;
//! use bqextract::core::{ExtractCoordinator, RunContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("bqextract.toml")?;
//!     let context = RunContext::resolve(&config.extract)?;
//!     let client = BigQueryClient::new(&config.warehouse, &context.billing_project)?;
//!
//!     let coordinator = ExtractCoordinator::new(
//!         context,
//!         Arc::new(client),
//!         Arc::new(JsonLinesSink::new("out")),
//!         "/dev/termination-log",
//!     );
//!     let summary = coordinator.run().await?;
//!
//!     println!("Exported {:?} rows", summary.total_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Batching
//!
//! With `batchColumn`, one batch is exported per distinct value of the
//! column. With `maxBatchSize` and `hashColumns`, rows are assigned to
//! `ceil(rows / maxBatchSize)` shards by a stable fingerprint of the hash
//! columns:
//!
//! ```rust
//! use bqextract::core::planner::shard_count;
//!
//! assert_eq!(shard_count(250, 100).unwrap(), 3);
//! assert_eq!(shard_count(0, 100).unwrap(), 0);
//! ```
//!
//! Batched runs write `batches=<id>,<id>,...` to the termination log so an
//! outer orchestrator can fan out per-batch work.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`], whose error type
//! [`domain::ExtractError`] maps onto the process exit code:
//!
//! ```rust
//! use bqextract::domain::ExtractError;
//!
//! let err = ExtractError::Configuration("exactly one input is required".into());
//! assert_eq!(err.exit_code(), 2);
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
