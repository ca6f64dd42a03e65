//! Newline-delimited JSON files under an output directory

use super::RecordSink;
use crate::domain::{ExtractError, Record, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Writes one JSON object per line to `<output_dir>/<filename>`
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    output_dir: PathBuf,
}

impl JsonLinesSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Resolves `filename` under the output directory
    ///
    /// Absolute paths and parent-directory components are rejected so that a
    /// batch value substituted into the pattern cannot escape the directory.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let relative = Path::new(filename);
        if filename.trim().is_empty() {
            return Err(ExtractError::Sink("Output filename is empty".to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ExtractError::Sink(format!(
                "Output filename '{filename}' must be a relative path inside the output directory"
            )));
        }
        Ok(self.output_dir.join(relative))
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn write_records(&self, filename: &str, records: &[Record]) -> Result<usize> {
        let path = self.resolve(filename)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExtractError::Sink(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut buffer = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buffer, record)?;
            buffer.push(b'\n');
        }

        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            ExtractError::Sink(format!("Failed to create {}: {e}", path.display()))
        })?;
        file.write_all(&buffer).await.map_err(|e| {
            ExtractError::Sink(format!("Failed to write {}: {e}", path.display()))
        })?;
        file.flush().await?;

        tracing::debug!(path = %path.display(), records = records.len(), "Records written");
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_write_records_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path());

        let records = vec![
            record(json!({"id": 1, "name": "a"})),
            record(json!({"id": 2, "name": null})),
        ];
        let written = sink
            .write_records("orders/part-0.jsonl", &records)
            .await
            .unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(dir.path().join("orders/part-0.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, json!({"id": 1, "name": "a"}));
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_write_empty_batch_truncates() {
        let dir = TempDir::new().unwrap();
        let sink = JsonLinesSink::new(dir.path());
        std::fs::write(dir.path().join("out.jsonl"), "old\n").unwrap();

        assert_eq!(sink.write_records("out.jsonl", &[]).await.unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.jsonl")).unwrap(),
            ""
        );
    }

    #[test]
    fn test_resolve_rejects_escaping_paths() {
        let sink = JsonLinesSink::new("/tmp/out");
        assert!(sink.resolve("../etc/passwd").is_err());
        assert!(sink.resolve("/etc/passwd").is_err());
        assert!(sink.resolve("a/../../b").is_err());
        assert!(sink.resolve("").is_err());
        assert_eq!(
            sink.resolve("./a/b.jsonl").unwrap(),
            PathBuf::from("/tmp/out/./a/b.jsonl")
        );
    }
}
