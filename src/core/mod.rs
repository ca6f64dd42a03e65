//! Core extraction logic for bqextract.
//!
//! # Modules
//!
//! - [`context`] - Run context resolved from configuration, and working state
//! - [`sql`] - GoogleSQL statement construction
//! - [`partition`] - Shard and column-value predicates
//! - [`staging`] - Staging table lifecycle
//! - [`planner`] - Batch planning
//! - [`export`] - Local-record and direct-export output paths
//! - [`manifest`] - Termination manifest
//! - [`coordinator`] - Run orchestration
//!
//! # Extraction Workflow
//!
//! 1. **Resolve**: Turn configuration into a [`context::RunContext`]
//! 2. **Stage** (optional): Materialize the source once, with a precomputed hash
//! 3. **Plan** (batched runs): Distinct column values or `ceil(rows / maxBatchSize)` shards
//! 4. **Export**: One query or `EXPORT DATA` per batch, in plan order
//! 5. **Clean up**: Drop the staging table
//! 6. **Manifest** (batched runs): `batches=<id>,<id>,...`
//!
//! # Example
//!
//! ```rust,no_run
//! use bqextract::adapters::bigquery::BigQueryClient;
//! use bqextract::adapters::sink::JsonLinesSink;
//! use bqextract::config::load_config;
//! use bqextract::core::context::RunContext;
//! use bqextract::core::coordinator::ExtractCoordinator;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("bqextract.toml")?;
//! let context = RunContext::resolve(&config.extract)?;
//! let client = BigQueryClient::new(&config.warehouse, &context.billing_project)?;
//! let sink = JsonLinesSink::new("/tmp/out");
//!
//! let coordinator = ExtractCoordinator::new(
//!     context,
//!     Arc::new(client),
//!     Arc::new(sink),
//!     "/dev/termination-log",
//! );
//! let summary = coordinator.run().await?;
//! println!("Batches: {}", summary.batches.len());
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod coordinator;
pub mod export;
pub mod manifest;
pub mod partition;
pub mod planner;
pub mod sql;
pub mod staging;

pub use context::{BatchStrategy, OutputStrategy, RunContext, SourceRef, WorkingState};
pub use coordinator::ExtractCoordinator;
