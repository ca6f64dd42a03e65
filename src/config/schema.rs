//! Configuration schema types
//!
//! This module defines the TOML configuration structure for bqextract.
//! Keys are camelCase throughout so that the `[extract]` table reads the same
//! as the step options it is usually generated from.

use crate::config::SecretString;
use crate::domain::{ColumnName, TableRef};
use serde::Deserialize;

/// Token replaced per batch in `filenamePattern`
pub const BATCH_PLACEHOLDER: &str = "{batch}";

/// Main bqextract configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConfig {
    /// What to read and how to split it
    pub extract: ExtractSettings,

    /// Warehouse connection settings
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ExtractConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid or contradictory
    pub fn validate(&self) -> Result<(), String> {
        self.extract.validate()?;
        self.warehouse.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Comma-separated string or TOML array of hash column names
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HashColumnsSpec {
    /// `hashColumns = ["a", "b"]`
    List(Vec<String>),
    /// `hashColumns = "a, b"`
    Csv(String),
}

impl HashColumnsSpec {
    /// Trimmed, non-empty column names in declaration order
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            HashColumnsSpec::List(items) => items.iter().map(String::as_str).collect(),
            HashColumnsSpec::Csv(csv) => csv.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Extraction settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSettings {
    /// Project billed for query jobs
    pub billing_project: String,

    /// Output filename, relative to the output directory or the storage prefix
    pub filename_pattern: String,

    /// Source table (`project.dataset.table`)
    #[serde(default)]
    pub input_table: Option<String>,

    /// Source view
    #[serde(default)]
    pub input_view: Option<String>,

    /// Ad-hoc source query
    #[serde(default)]
    pub input_query: Option<String>,

    /// Staging table materialized before batching
    #[serde(default)]
    pub temp_table: Option<String>,

    /// Row cap applied to the source
    #[serde(default)]
    pub limit: Option<u64>,

    /// `gs://` prefix; when present rows are exported directly to storage
    #[serde(default)]
    pub storage_uri_prefix: Option<String>,

    /// Column whose distinct values define the batches
    #[serde(default)]
    pub batch_column: Option<String>,

    /// Maximum rows per hash shard
    #[serde(default)]
    pub max_batch_size: Option<u64>,

    /// Columns hashed to assign rows to shards
    #[serde(default)]
    pub hash_columns: Option<HashColumnsSpec>,

    /// Stringify every column value before writing local records
    #[serde(default)]
    pub convert_columns_to_string: bool,
}

/// Returns the trimmed value when present and not blank
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ExtractSettings {
    /// Hash column names, `None` when not configured or empty
    pub fn hash_column_names(&self) -> Option<Vec<String>> {
        self.hash_columns
            .as_ref()
            .map(HashColumnsSpec::names)
            .filter(|names| !names.is_empty())
    }

    /// Whether any batching strategy is configured
    pub fn is_batching(&self) -> bool {
        non_blank(&self.batch_column).is_some() || self.max_batch_size.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.billing_project.trim().is_empty() {
            return Err("extract.billingProject cannot be empty".to_string());
        }

        if self.filename_pattern.trim().is_empty() {
            return Err("extract.filenamePattern cannot be empty".to_string());
        }

        let inputs = [
            ("inputTable", non_blank(&self.input_table)),
            ("inputView", non_blank(&self.input_view)),
            ("inputQuery", non_blank(&self.input_query)),
        ];
        let configured: Vec<&str> = inputs
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(name, _)| *name)
            .collect();
        match configured.len() {
            1 => {}
            0 => {
                return Err(
                    "Exactly one of extract.inputTable, extract.inputView or extract.inputQuery must be set, got none"
                        .to_string(),
                )
            }
            _ => {
                return Err(format!(
                    "Exactly one of extract.inputTable, extract.inputView or extract.inputQuery must be set, got: {}",
                    configured.join(", ")
                ))
            }
        }

        for (name, value) in [
            ("inputTable", non_blank(&self.input_table)),
            ("inputView", non_blank(&self.input_view)),
            ("tempTable", non_blank(&self.temp_table)),
        ] {
            if let Some(value) = value {
                TableRef::new(value).map_err(|e| format!("extract.{name}: {e}"))?;
            }
        }

        let batch_column = non_blank(&self.batch_column);
        if let Some(column) = batch_column {
            ColumnName::new(column).map_err(|e| format!("extract.batchColumn: {e}"))?;
        }

        let hash_columns = self.hash_column_names();
        if let Some(names) = &hash_columns {
            for name in names {
                ColumnName::new(name.as_str()).map_err(|e| format!("extract.hashColumns: {e}"))?;
            }
        }

        match (batch_column, self.max_batch_size) {
            (Some(_), Some(_)) => {
                return Err(
                    "extract.batchColumn and extract.maxBatchSize are mutually exclusive"
                        .to_string(),
                )
            }
            (None, Some(0)) => return Err("extract.maxBatchSize must be > 0".to_string()),
            (None, Some(_)) if hash_columns.is_none() => {
                return Err("extract.maxBatchSize requires extract.hashColumns".to_string())
            }
            (_, None) if hash_columns.is_some() => {
                return Err(
                    "extract.hashColumns is only valid together with extract.maxBatchSize"
                        .to_string(),
                )
            }
            _ => {}
        }

        if self.is_batching() && !self.filename_pattern.contains(BATCH_PLACEHOLDER) {
            return Err(format!(
                "extract.filenamePattern must contain the placeholder '{BATCH_PLACEHOLDER}' when batching is enabled"
            ));
        }

        if let Some(prefix) = non_blank(&self.storage_uri_prefix) {
            let parsed = url::Url::parse(prefix)
                .map_err(|e| format!("extract.storageUriPrefix is not a valid URI: {e}"))?;
            if parsed.scheme() != "gs" {
                return Err("extract.storageUriPrefix must start with gs://".to_string());
            }
        }

        if self.limit == Some(0) {
            return Err("extract.limit must be > 0".to_string());
        }

        Ok(())
    }
}

/// BigQuery connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseConfig {
    /// BigQuery REST API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// OAuth2 bearer token
    #[serde(default)]
    pub access_token: Option<SecretString>,

    /// Job location (e.g. `EU`)
    #[serde(default)]
    pub location: Option<String>,

    /// Maximum time to wait for a single job
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Delay between job status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WarehouseConfig {
    fn validate(&self) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err("warehouse.endpoint must start with http:// or https://".to_string());
        }

        if let Some(token) = &self.access_token {
            if token.expose_secret().is_blank() {
                return Err("warehouse.accessToken cannot be empty".to_string());
            }
        }

        if self.timeout_seconds == 0 {
            return Err("warehouse.timeoutSeconds must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: None,
            location: None,
            timeout_seconds: default_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Enable JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.localRotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.localPath cannot be empty when file logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_endpoint() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_local_path() -> String {
    "/var/log/bqextract".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ExtractSettings {
        ExtractSettings {
            billing_project: "billing".to_string(),
            filename_pattern: "part-{batch}.jsonl".to_string(),
            input_table: Some("proj.ds.events".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_settings_valid() {
        assert!(settings().validate().is_ok());
    }

    #[test]
    fn test_requires_exactly_one_input() {
        let mut s = settings();
        s.input_table = None;
        let err = s.validate().unwrap_err();
        assert!(err.contains("got none"));

        let mut s = settings();
        s.input_view = Some("proj.ds.v".to_string());
        let err = s.validate().unwrap_err();
        assert!(err.contains("inputTable, inputView"));

        let mut s = settings();
        s.input_view = Some("proj.ds.v".to_string());
        s.input_query = Some("SELECT 1".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_blank_input_counts_as_unset() {
        let mut s = settings();
        s.input_view = Some("   ".to_string());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_batch_column_and_max_batch_size_exclusive() {
        let mut s = settings();
        s.batch_column = Some("month".to_string());
        s.max_batch_size = Some(100);
        s.hash_columns = Some(HashColumnsSpec::Csv("id".to_string()));
        let err = s.validate().unwrap_err();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn test_max_batch_size_requires_hash_columns() {
        let mut s = settings();
        s.max_batch_size = Some(100);
        let err = s.validate().unwrap_err();
        assert!(err.contains("requires extract.hashColumns"));

        s.hash_columns = Some(HashColumnsSpec::Csv(" , ".to_string()));
        assert!(s.validate().is_err());

        s.hash_columns = Some(HashColumnsSpec::Csv("id, ts".to_string()));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_max_batch_size_zero_rejected() {
        let mut s = settings();
        s.max_batch_size = Some(0);
        s.hash_columns = Some(HashColumnsSpec::Csv("id".to_string()));
        assert!(s.validate().unwrap_err().contains("must be > 0"));
    }

    #[test]
    fn test_hash_columns_only_with_max_batch_size() {
        let mut s = settings();
        s.hash_columns = Some(HashColumnsSpec::List(vec!["id".to_string()]));
        assert!(s.validate().unwrap_err().contains("only valid"));

        s.batch_column = Some("month".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_placeholder_required_when_batching() {
        let mut s = settings();
        s.filename_pattern = "out.jsonl".to_string();
        assert!(s.validate().is_ok());

        s.batch_column = Some("month".to_string());
        assert!(s.validate().unwrap_err().contains("{batch}"));
    }

    #[test]
    fn test_storage_prefix_must_be_gs() {
        let mut s = settings();
        s.storage_uri_prefix = Some("gs://bucket/exports/".to_string());
        assert!(s.validate().is_ok());

        s.storage_uri_prefix = Some("s3://bucket/".to_string());
        assert!(s.validate().is_err());

        s.storage_uri_prefix = Some("not a uri".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let mut s = settings();
        s.batch_column = Some("month; DROP TABLE x".to_string());
        assert!(s.validate().is_err());

        let mut s = settings();
        s.temp_table = Some("ds.`tmp`".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_hash_columns_spec_names() {
        let csv = HashColumnsSpec::Csv(" a, b ,,c ".to_string());
        assert_eq!(csv.names(), vec!["a", "b", "c"]);

        let list = HashColumnsSpec::List(vec![" x ".to_string(), "".to_string()]);
        assert_eq!(list.names(), vec!["x"]);
    }

    #[test]
    fn test_warehouse_config_default() {
        let config = WarehouseConfig::default();
        assert_eq!(config.endpoint, "https://bigquery.googleapis.com/bigquery/v2");
        assert_eq!(config.timeout_seconds, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "weekly".to_string();
        assert!(config.validate().is_err());
    }
}
