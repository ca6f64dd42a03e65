//! Local record export
//!
//! Materializes each batch in memory and hands it to a record sink.

use super::{batch_label, batch_select, PlannedBatch};
use crate::adapters::sink::RecordSink;
use crate::adapters::warehouse::WarehouseClient;
use crate::core::context::{BatchStrategy, WorkingState};
use crate::core::sql::Statement;
use crate::domain::{Record, Result};
use serde_json::Value;
use std::time::Instant;

/// Writes query results as newline-delimited records
pub struct LocalRecordExporter<'a> {
    client: &'a dyn WarehouseClient,
    sink: &'a dyn RecordSink,
    convert_to_string: bool,
}

impl<'a> LocalRecordExporter<'a> {
    pub fn new(
        client: &'a dyn WarehouseClient,
        sink: &'a dyn RecordSink,
        convert_to_string: bool,
    ) -> Self {
        Self {
            client,
            sink,
            convert_to_string,
        }
    }

    /// Exports one batch (or the whole source) to `filename`
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Surfaces warehouse and sink errors unchanged.
    pub async fn export(
        &self,
        strategy: &BatchStrategy,
        state: &WorkingState,
        batch: Option<PlannedBatch<'_>>,
        filename: &str,
    ) -> Result<u64> {
        let statement = Statement::query(&batch_select(strategy, state, batch)?);
        tracing::debug!(sql = %statement, filename = %filename, "Querying batch");

        let start = Instant::now();
        let mut result = self.client.execute_query(&statement).await?;
        if self.convert_to_string {
            result.rows.iter_mut().for_each(stringify_record);
        }

        let written = self.sink.write_records(filename, &result.rows).await?;
        tracing::info!(
            batch = %batch_label(batch),
            filename = %filename,
            rows = written,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch written"
        );
        Ok(written as u64)
    }
}

/// Replaces every non-null value with its string form
pub fn stringify_record(record: &mut Record) {
    for value in record.values_mut() {
        match value {
            Value::Null | Value::String(_) => {}
            other => *other = Value::String(other.to_string()),
        }
    }
}
