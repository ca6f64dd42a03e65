//! Batch export
//!
//! This module provides the two output paths and the select construction
//! they share:
//! - Local records written through a [`RecordSink`](crate::adapters::sink::RecordSink)
//! - Direct `EXPORT DATA` to Cloud Storage
//! - Summary and reporting
//!
//! Both paths build their `SELECT` with [`batch_select`], so a batch
//! identifier selects the same rows whichever path runs.

pub mod local;
pub mod storage;
pub mod summary;

pub use local::LocalRecordExporter;
pub use storage::StorageExporter;
pub use summary::{ExtractSummary, OutputKind};

use super::context::{BatchStrategy, WorkingState};
use super::partition::{batch_predicate, hash_column};
use super::sql::Select;
use crate::domain::{BatchId, Result};

/// One planned batch together with the full plan length
#[derive(Debug, Clone, Copy)]
pub struct PlannedBatch<'a> {
    pub id: &'a BatchId,
    pub batch_count: usize,
}

pub(crate) fn batch_label(batch: Option<PlannedBatch<'_>>) -> String {
    batch.map_or_else(|| "all".to_string(), |b| b.id.to_string())
}

/// `SELECT` for `batch`, or for the whole source when `batch` is `None`
///
/// The staging hash column is always excluded when present, and column
/// batching also excludes the batch column. The with-clause and row limit
/// are applied while the working state still carries them.
pub fn batch_select(
    strategy: &BatchStrategy,
    state: &WorkingState,
    batch: Option<PlannedBatch<'_>>,
) -> Result<Select> {
    let mut select = Select::all_from(state.relation.clone())
        .with_clause(state.with_clause.as_deref())
        .limit(state.limit);

    if state.hash_staged {
        select = select.except(hash_column());
    }

    if let Some(batch) = batch {
        if let BatchStrategy::Column { column } = strategy {
            select = select.except(column.clone());
        }
        let predicate = batch_predicate(strategy, state, batch.id, batch.batch_count)?;
        select = select.filter(Some(predicate));
    }

    Ok(select)
}
