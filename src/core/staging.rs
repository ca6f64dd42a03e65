//! Staging table lifecycle
//!
//! A staging table materializes the working source once, optionally with a
//! precomputed `hashcol`, so that batch queries scan and hash a single time.

use super::context::WorkingState;
use super::partition::{hash_column, hash_expression};
use super::sql::{Select, Statement};
use crate::adapters::warehouse::WarehouseClient;
use crate::domain::{ColumnName, Result, TableRef};
use std::time::Instant;

/// Creates and drops the run's staging table
pub struct StagingTableManager<'a> {
    client: &'a dyn WarehouseClient,
}

impl<'a> StagingTableManager<'a> {
    pub fn new(client: &'a dyn WarehouseClient) -> Self {
        Self { client }
    }

    /// Statement materializing `state` into `staging`
    pub fn create_statement(
        state: &WorkingState,
        staging: &TableRef,
        hash_columns: Option<&[ColumnName]>,
    ) -> Result<Statement> {
        let mut select = Select::all_from(state.relation.clone())
            .with_clause(state.with_clause.as_deref())
            .limit(state.limit);
        let cluster_by = match hash_columns {
            Some(columns) => {
                select = select.with_computed(hash_expression(columns)?, hash_column());
                Some(hash_column())
            }
            None => None,
        };
        Ok(Statement::create_table_as(
            staging,
            cluster_by.as_ref(),
            &select,
        ))
    }

    /// Materializes the working source into `staging` and returns the new state
    ///
    /// # Errors
    ///
    /// Surfaces the warehouse error unchanged; nothing is retried.
    pub async fn create_staging(
        &self,
        state: WorkingState,
        staging: &TableRef,
        hash_columns: Option<&[ColumnName]>,
    ) -> Result<WorkingState> {
        let statement = Self::create_statement(&state, staging, hash_columns)?;
        tracing::debug!(sql = %statement, "Creating staging table");

        let start = Instant::now();
        self.client.execute(&statement).await?;

        tracing::info!(
            staging_table = %staging,
            hashed = hash_columns.is_some(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Staging table created"
        );
        Ok(state.staged(staging.clone(), hash_columns.is_some()))
    }

    /// Drops `staging`; a missing table is not an error
    ///
    /// # Errors
    ///
    /// Returns an error when deletion fails for a reason other than absence.
    pub async fn drop_staging(&self, staging: &TableRef) -> Result<()> {
        self.client.delete_table(staging, true).await?;
        tracing::info!(staging_table = %staging, "Staging table dropped");
        Ok(())
    }
}
