//! Direct export to Cloud Storage

use super::{batch_label, batch_select, PlannedBatch};
use crate::adapters::warehouse::WarehouseClient;
use crate::core::context::{BatchStrategy, WorkingState};
use crate::core::sql::Statement;
use crate::domain::Result;
use std::time::Instant;

/// Runs `EXPORT DATA` per batch; the warehouse reports no row counts here
pub struct StorageExporter<'a> {
    client: &'a dyn WarehouseClient,
}

impl<'a> StorageExporter<'a> {
    pub fn new(client: &'a dyn WarehouseClient) -> Self {
        Self { client }
    }

    /// Exports one batch (or the whole source) to `uri`
    ///
    /// # Errors
    ///
    /// Surfaces warehouse errors unchanged.
    pub async fn export(
        &self,
        strategy: &BatchStrategy,
        state: &WorkingState,
        batch: Option<PlannedBatch<'_>>,
        uri: &str,
    ) -> Result<()> {
        let select = batch_select(strategy, state, batch)?;
        let statement = Statement::export_data(uri, &select);
        tracing::debug!(sql = %statement, uri = %uri, "Exporting batch");

        let start = Instant::now();
        self.client.execute(&statement).await?;
        tracing::info!(
            batch = %batch_label(batch),
            uri = %uri,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch exported"
        );
        Ok(())
    }
}
