//! Domain models and types for bqextract.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`TableRef`], [`ColumnName`])
//! - **Batch identifiers** ([`BatchId`]) and exported rows ([`Record`])
//! - **Error types** ([`ExtractError`], [`WarehouseError`])
//! - **Result type alias** ([`Result`])
//!
//! Identifiers validate on construction, so anything that reaches the SQL
//! builder is already known to be quotable:
//!
//! ```rust
//! use bqextract::domain::{ColumnName, TableRef};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = TableRef::new("proj.sales.orders")?;
//! let column = ColumnName::new("order_month")?;
//! assert_eq!(table.table(), "orders");
//! assert_eq!(column.as_str(), "order_month");
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod errors;
pub mod ids;
pub mod result;

pub use batch::{BatchId, LiteralKind, Record};
pub use errors::{ExtractError, WarehouseError};
pub use ids::{ColumnName, TableRef};
pub use result::Result;
