//! External system integrations for bqextract.
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`warehouse`] - Warehouse abstraction layer (trait-based)
//! - [`bigquery`] - BigQuery REST API implementation
//! - [`sink`] - Local record sinks
//!
//! # Design Pattern
//!
//! Adapters isolate external dependencies behind traits so that the
//! extraction core can be exercised against in-memory fakes.
//!
//! ```rust,no_run
//! use bqextract::adapters::bigquery::BigQueryClient;
//! use bqextract::adapters::warehouse::WarehouseClient;
//! use bqextract::config::{secret_string, WarehouseConfig};
//! use bqextract::domain::TableRef;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WarehouseConfig {
//!     access_token: Some(secret_string("ya29.token".to_string())),
//!     location: Some("EU".to_string()),
//!     ..Default::default()
//! };
//!
//! let client = BigQueryClient::new(&config, "my-billing-project")?;
//! let metadata = client.table_metadata(&TableRef::new("proj.sales.orders")?).await?;
//! println!("{} rows", metadata.row_count);
//! # Ok(())
//! # }
//! ```

pub mod bigquery;
pub mod sink;
pub mod warehouse;
