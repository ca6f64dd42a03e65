//! Termination manifest
//!
//! Batched runs leave the ordered batch list at a fixed path so that an
//! outer orchestration layer can fan out per-batch work.

use crate::domain::{BatchId, ExtractError, Result};
use std::path::Path;

/// Prefix of the manifest content
pub const BATCHES_PREFIX: &str = "batches=";

/// Default manifest location
pub const DEFAULT_TERMINATION_LOG: &str = "/dev/termination-log";

/// `batches=<id>,<id>,...` with no trailing separator
///
/// ```
/// use bqextract::core::manifest::format_manifest;
/// use bqextract::domain::BatchId;
///
/// let batches = vec![BatchId::Value("2023-01".into()), BatchId::Value("2023-02".into())];
/// assert_eq!(format_manifest(&batches), "batches=2023-01,2023-02");
/// ```
pub fn format_manifest(batches: &[BatchId]) -> String {
    let ids: Vec<String> = batches.iter().map(ToString::to_string).collect();
    format!("{BATCHES_PREFIX}{}", ids.join(","))
}

/// Writes the manifest for `batches` to `path`, replacing any previous content
///
/// # Errors
///
/// Returns [`ExtractError::Io`] if the file cannot be written.
pub async fn write_manifest(path: &Path, batches: &[BatchId]) -> Result<()> {
    let content = format_manifest(batches);
    tokio::fs::write(path, content.as_bytes())
        .await
        .map_err(|e| {
            ExtractError::Io(format!(
                "Failed to write termination log {}: {e}",
                path.display()
            ))
        })?;
    tracing::info!(path = %path.display(), batch_count = batches.len(), "Termination manifest written");
    Ok(())
}
