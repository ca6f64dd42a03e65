//! Configuration management for bqextract.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `BQEXTRACT_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every contradictory option combination before any
//!   warehouse call is made
//!
//! # Example Configuration
//!
//! ```toml
//! [extract]
//! billingProject = "my-billing-project"
//! inputQuery = "SELECT * FROM `proj.sales.orders` WHERE year = 2024"
//! tempTable = "proj.scratch.orders_staging"
//! maxBatchSize = 500000
//! hashColumns = "order_id"
//! filenamePattern = "orders/part-{batch}.jsonl"
//!
//! [warehouse]
//! accessToken = "${GCP_ACCESS_TOKEN}"
//!
//! [logging]
//! localEnabled = false
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bqextract::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("bqextract.toml")?;
//! println!("Billing project: {}", config.extract.billing_project);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ExtractConfig, ExtractSettings, HashColumnsSpec, LoggingConfig, WarehouseConfig,
    BATCH_PLACEHOLDER,
};
pub use secret::{secret_string, SecretString, SecretValue};
