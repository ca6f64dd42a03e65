//! Local record sinks

pub mod jsonl;

pub use jsonl::JsonLinesSink;

use crate::domain::{Record, Result};
use async_trait::async_trait;

/// Destination for materialized batches
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write `records` to `filename`, replacing any existing content
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ExtractError::Sink`] for unusable filenames
    /// and I/O failures.
    async fn write_records(&self, filename: &str, records: &[Record]) -> Result<usize>;
}
