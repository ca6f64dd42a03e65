//! Warehouse abstraction layer
//!
//! The orchestration core talks to the warehouse only through
//! [`WarehouseClient`], so tests can substitute an in-memory fake.

pub mod traits;

pub use traits::{Column, QueryResult, TableMetadata, WarehouseClient};
