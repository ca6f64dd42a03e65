//! Extraction coordinator - main orchestrator for a run
//!
//! Sequences staging, planning, export, staging cleanup and manifest
//! emission. Every decision is taken from the [`RunContext`] resolved at
//! start-up; the only state carried between phases is the [`WorkingState`]
//! returned by staging.

use crate::adapters::sink::RecordSink;
use crate::adapters::warehouse::WarehouseClient;
use crate::core::context::{OutputStrategy, RunContext, WorkingState};
use crate::core::export::{
    ExtractSummary, LocalRecordExporter, OutputKind, PlannedBatch, StorageExporter,
};
use crate::core::manifest::write_manifest;
use crate::core::planner::BatchPlanner;
use crate::core::staging::StagingTableManager;
use crate::domain::{BatchId, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Extraction coordinator
pub struct ExtractCoordinator {
    context: RunContext,
    client: Arc<dyn WarehouseClient>,
    sink: Arc<dyn RecordSink>,
    termination_log: PathBuf,
}

impl ExtractCoordinator {
    /// Create a new coordinator for a resolved run
    pub fn new(
        context: RunContext,
        client: Arc<dyn WarehouseClient>,
        sink: Arc<dyn RecordSink>,
        termination_log: impl Into<PathBuf>,
    ) -> Self {
        Self {
            context,
            client,
            sink,
            termination_log: termination_log.into(),
        }
    }

    /// The resolved run context
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Execute the run
    ///
    /// 1. Creates the staging table, if configured
    /// 2. Plans batches, if batching is active
    /// 3. Exports every batch in plan order (or the whole source once)
    /// 4. Drops the staging table, whether or not the earlier phases succeeded
    /// 5. Writes the termination manifest for batched runs
    ///
    /// # Errors
    ///
    /// The first failing phase aborts the run. A failure while creating the
    /// staging table, planning or exporting is returned even when staging
    /// cleanup also fails; the cleanup failure is logged. No manifest is
    /// written for a failed run.
    pub async fn run(&self) -> Result<ExtractSummary> {
        let start = Instant::now();
        tracing::info!(
            source = ?self.context.source,
            batching = ?self.context.batching,
            output = ?self.context.output,
            staging_table = self.context.staging_table.as_ref().map(|t| t.as_str()),
            "Starting extraction"
        );

        let mut state = self.context.initial_state();
        if let Some(staging) = &self.context.staging_table {
            let manager = StagingTableManager::new(self.client.as_ref());
            state = match manager
                .create_staging(state, staging, self.context.batching.hash_columns())
                .await
            {
                Ok(staged) => staged,
                Err(e) => {
                    // the statement may still complete server-side
                    if let Err(cleanup_err) = manager.drop_staging(staging).await {
                        tracing::error!(
                            error = %cleanup_err,
                            "Failed to drop staging table after a failed creation"
                        );
                    }
                    return Err(e);
                }
            };
        }

        let outcome = self.plan_and_export(&state).await;
        let cleanup = self.cleanup(&state).await;

        let mut summary = match (outcome, cleanup) {
            (Ok(summary), Ok(())) => summary,
            (Ok(_), Err(cleanup_err)) => return Err(cleanup_err),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(cleanup_err)) => {
                tracing::error!(
                    error = %cleanup_err,
                    "Failed to drop staging table after a failed run"
                );
                return Err(e);
            }
        };

        if summary.batched {
            write_manifest(&self.termination_log, &summary.batches).await?;
        }

        summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    async fn plan_and_export(&self, state: &WorkingState) -> Result<ExtractSummary> {
        let batching = &self.context.batching;
        let batches = if batching.is_batched() {
            Some(
                BatchPlanner::new(self.client.as_ref())
                    .plan(batching, state)
                    .await?,
            )
        } else {
            None
        };

        let export_start = Instant::now();
        let mut summary = self.export(state, batches.as_deref()).await?;
        tracing::info!(
            destinations = summary.destinations.len(),
            duration_ms = export_start.elapsed().as_millis() as u64,
            "Export phase finished"
        );

        summary.batched = batches.is_some();
        summary.batches = batches.unwrap_or_default();
        summary.staged = state.staging.is_some();
        Ok(summary)
    }

    async fn export(
        &self,
        state: &WorkingState,
        batches: Option<&[BatchId]>,
    ) -> Result<ExtractSummary> {
        let targets: Vec<Option<PlannedBatch<'_>>> = match batches {
            Some(list) => list
                .iter()
                .map(|id| {
                    Some(PlannedBatch {
                        id,
                        batch_count: list.len(),
                    })
                })
                .collect(),
            None => vec![None],
        };
        let strategy = &self.context.batching;

        match &self.context.output {
            OutputStrategy::LocalRecords { convert_to_string } => {
                let exporter = LocalRecordExporter::new(
                    self.client.as_ref(),
                    self.sink.as_ref(),
                    *convert_to_string,
                );
                let mut summary = ExtractSummary::new(OutputKind::LocalRecords);
                for batch in targets {
                    let filename = self.context.filename(batch.map(|b| b.id));
                    let rows = exporter.export(strategy, state, batch, &filename).await?;
                    summary.record_output(filename, Some(rows));
                }
                tracing::info!(
                    total_rows = summary.total_rows,
                    max_batch_rows = summary.max_batch_rows,
                    "Local records extracted"
                );
                Ok(summary)
            }
            OutputStrategy::DirectExport { uri_prefix } => {
                let exporter = StorageExporter::new(self.client.as_ref());
                let mut summary = ExtractSummary::new(OutputKind::DirectExport);
                for batch in targets {
                    let uri = self.context.storage_uri(uri_prefix, batch.map(|b| b.id));
                    exporter.export(strategy, state, batch, &uri).await?;
                    summary.record_output(uri, None);
                }
                Ok(summary)
            }
        }
    }

    async fn cleanup(&self, state: &WorkingState) -> Result<()> {
        match &state.staging {
            Some(staging) => {
                StagingTableManager::new(self.client.as_ref())
                    .drop_staging(staging)
                    .await
            }
            None => Ok(()),
        }
    }
}
