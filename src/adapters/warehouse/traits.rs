//! Warehouse client traits
//!
//! This module defines the trait that warehouse adapters must implement
//! to be driven by the extraction coordinator.

use crate::core::sql::Statement;
use crate::domain::{Record, Result, TableRef};
use async_trait::async_trait;

/// A result column as reported by the warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Warehouse type name (`STRING`, `INT64`, `RECORD`, ...)
    pub data_type: String,
}

/// Fully materialized query result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Result schema, in select-list order
    pub schema: Vec<Column>,

    /// Decoded rows keyed by column name
    pub rows: Vec<Record>,
}

impl QueryResult {
    /// Number of rows returned
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were returned
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the first column, in row order
    pub fn first_column(&self) -> Vec<&serde_json::Value> {
        let Some(name) = self.schema.first().map(|c| c.name.as_str()) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| row.get(name).unwrap_or(&serde_json::Value::Null))
            .collect()
    }
}

/// Table metadata subset used for planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMetadata {
    /// Number of rows stored in the table
    pub row_count: u64,
}

/// Warehouse client trait
///
/// Every call blocks (awaits) until the warehouse reports the job finished.
/// Implementations must not retry failed statements.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Execute a query and materialize its full result
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::WarehouseError`] (wrapped) when the warehouse
    /// rejects or fails the statement.
    async fn execute_query(&self, statement: &Statement) -> Result<QueryResult>;

    /// Execute a statement to completion, discarding any rows
    ///
    /// Used for DDL and `EXPORT DATA`.
    ///
    /// # Errors
    ///
    /// Returns an error when the warehouse rejects or fails the statement.
    async fn execute(&self, statement: &Statement) -> Result<()>;

    /// Read table metadata
    ///
    /// # Errors
    ///
    /// Returns an error when the table does not exist or cannot be read.
    async fn table_metadata(&self, table: &TableRef) -> Result<TableMetadata>;

    /// Delete a table
    ///
    /// With `ignore_missing` a table that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when deletion fails for any other reason.
    async fn delete_table(&self, table: &TableRef, ignore_missing: bool) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_column() {
        let mut row = Record::new();
        row.insert("month".to_string(), json!("2023-01"));
        let result = QueryResult {
            schema: vec![Column {
                name: "month".to_string(),
                data_type: "STRING".to_string(),
            }],
            rows: vec![row, Record::new()],
        };
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.first_column(),
            vec![&json!("2023-01"), &serde_json::Value::Null]
        );
    }

    #[test]
    fn test_first_column_without_schema() {
        assert!(QueryResult::default().first_column().is_empty());
    }
}
