//! Run context and working state
//!
//! [`RunContext`] is resolved once from configuration and never changes during
//! a run. [`WorkingState`] describes what generated queries currently read
//! from; it only changes through [`WorkingState::staged`].

use super::sql::{query_with_clause, Relation};
use crate::config::schema::{non_blank, ExtractSettings, BATCH_PLACEHOLDER};
use crate::domain::{BatchId, ColumnName, ExtractError, Result, TableRef};

/// What the run reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// Persisted table; row count available from metadata
    Table(TableRef),
    /// View; rows must be counted with a query
    View(TableRef),
    /// Ad-hoc query wrapped as the `data` CTE
    Query(String),
}

/// How the total row count is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    /// Issue `SELECT COUNT(*)`
    Query,
    /// Read `numRows` from table metadata
    Metadata,
}

/// Batching strategy, decided once at resolution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStrategy {
    /// One export of the whole source
    Unbatched,
    /// One batch per distinct value of `column`
    Column { column: ColumnName },
    /// `ceil(rows / max_batch_size)` hash shards
    Shard {
        max_batch_size: u64,
        hash_columns: Vec<ColumnName>,
    },
}

impl BatchStrategy {
    /// Whether the planner runs at all
    pub fn is_batched(&self) -> bool {
        !matches!(self, BatchStrategy::Unbatched)
    }

    /// Hash columns, when sharding
    pub fn hash_columns(&self) -> Option<&[ColumnName]> {
        match self {
            BatchStrategy::Shard { hash_columns, .. } => Some(hash_columns),
            _ => None,
        }
    }
}

/// Output strategy, decided once at resolution time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStrategy {
    /// Materialize rows and write newline-delimited records locally
    LocalRecords { convert_to_string: bool },
    /// `EXPORT DATA` straight to Cloud Storage
    DirectExport { uri_prefix: String },
}

/// Immutable description of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub billing_project: String,
    pub source: SourceRef,
    pub staging_table: Option<TableRef>,
    pub limit: Option<u64>,
    pub batching: BatchStrategy,
    pub output: OutputStrategy,
    pub filename_pattern: String,
}

fn table_ref(field: &str, value: &str) -> Result<TableRef> {
    TableRef::new(value).map_err(|e| ExtractError::Configuration(format!("extract.{field}: {e}")))
}

fn column_name(field: &str, value: &str) -> Result<ColumnName> {
    ColumnName::new(value).map_err(|e| ExtractError::Configuration(format!("extract.{field}: {e}")))
}

impl RunContext {
    /// Resolves validated settings into closed strategy enums
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Configuration`] for any invalid or contradictory option.
    pub fn resolve(settings: &ExtractSettings) -> Result<Self> {
        settings.validate().map_err(ExtractError::Configuration)?;

        let source = match (
            non_blank(&settings.input_table),
            non_blank(&settings.input_view),
            non_blank(&settings.input_query),
        ) {
            (Some(table), None, None) => SourceRef::Table(table_ref("inputTable", table)?),
            (None, Some(view), None) => SourceRef::View(table_ref("inputView", view)?),
            (None, None, Some(query)) => SourceRef::Query(query.to_string()),
            _ => {
                return Err(ExtractError::Configuration(
                    "Exactly one input must be configured".to_string(),
                ))
            }
        };

        let staging_table = non_blank(&settings.temp_table)
            .map(|t| table_ref("tempTable", t))
            .transpose()?;

        let batching = match (non_blank(&settings.batch_column), settings.max_batch_size) {
            (Some(column), None) => BatchStrategy::Column {
                column: column_name("batchColumn", column)?,
            },
            (None, Some(max_batch_size)) => {
                let hash_columns = settings
                    .hash_column_names()
                    .unwrap_or_default()
                    .iter()
                    .map(|c| column_name("hashColumns", c))
                    .collect::<Result<Vec<_>>>()?;
                BatchStrategy::Shard {
                    max_batch_size,
                    hash_columns,
                }
            }
            (None, None) => BatchStrategy::Unbatched,
            (Some(_), Some(_)) => {
                return Err(ExtractError::Configuration(
                    "extract.batchColumn and extract.maxBatchSize are mutually exclusive"
                        .to_string(),
                ))
            }
        };

        let output = match non_blank(&settings.storage_uri_prefix) {
            Some(prefix) => OutputStrategy::DirectExport {
                uri_prefix: prefix.to_string(),
            },
            None => OutputStrategy::LocalRecords {
                convert_to_string: settings.convert_columns_to_string,
            },
        };

        Ok(Self {
            billing_project: settings.billing_project.trim().to_string(),
            source,
            staging_table,
            limit: settings.limit,
            batching,
            output,
            filename_pattern: settings.filename_pattern.clone(),
        })
    }

    /// Working state before any staging table exists
    pub fn initial_state(&self) -> WorkingState {
        let (relation, with_clause, count_mode) = match &self.source {
            SourceRef::Table(table) => (Relation::Table(table.clone()), None, CountMode::Metadata),
            SourceRef::View(view) => (Relation::Table(view.clone()), None, CountMode::Query),
            SourceRef::Query(query) => (
                Relation::QueryCte,
                Some(query_with_clause(query)),
                CountMode::Query,
            ),
        };
        WorkingState {
            relation,
            with_clause,
            limit: self.limit,
            count_mode,
            hash_staged: false,
            staging: None,
        }
    }

    /// Filename for `batch`, or the raw pattern for an unbatched run
    pub fn filename(&self, batch: Option<&BatchId>) -> String {
        match batch {
            Some(batch) => self
                .filename_pattern
                .replace(BATCH_PLACEHOLDER, &batch.to_string()),
            None => self.filename_pattern.clone(),
        }
    }

    /// Destination URI for `batch` under the storage prefix
    pub fn storage_uri(&self, uri_prefix: &str, batch: Option<&BatchId>) -> String {
        format!("{uri_prefix}{}", self.filename(batch))
    }
}

/// Where generated queries currently read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingState {
    pub relation: Relation,
    pub with_clause: Option<String>,
    pub limit: Option<u64>,
    pub count_mode: CountMode,
    /// The relation carries a precomputed `hashcol`
    pub hash_staged: bool,
    /// Staging table created for this run, if any
    pub staging: Option<TableRef>,
}

impl WorkingState {
    /// State after `staging` was materialized from this state
    ///
    /// The staging table already applied the with-clause and the row limit,
    /// and its row count is exact in metadata.
    pub fn staged(self, staging: TableRef, hash_staged: bool) -> Self {
        Self {
            relation: Relation::Table(staging.clone()),
            with_clause: None,
            limit: None,
            count_mode: CountMode::Metadata,
            hash_staged,
            staging: Some(staging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashColumnsSpec;

    fn settings() -> ExtractSettings {
        ExtractSettings {
            billing_project: "billing".to_string(),
            filename_pattern: "out-{batch}.jsonl".to_string(),
            input_table: Some("p.d.t".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_unbatched_local() {
        let ctx = RunContext::resolve(&settings()).unwrap();
        assert_eq!(ctx.source, SourceRef::Table(TableRef::new("p.d.t").unwrap()));
        assert_eq!(ctx.batching, BatchStrategy::Unbatched);
        assert_eq!(
            ctx.output,
            OutputStrategy::LocalRecords {
                convert_to_string: false
            }
        );
        assert!(ctx.staging_table.is_none());
    }

    #[test]
    fn test_resolve_shard_strategy() {
        let mut s = settings();
        s.max_batch_size = Some(100);
        s.hash_columns = Some(HashColumnsSpec::Csv("a, b".to_string()));
        s.storage_uri_prefix = Some("gs://bucket/x/".to_string());
        let ctx = RunContext::resolve(&s).unwrap();
        match &ctx.batching {
            BatchStrategy::Shard {
                max_batch_size,
                hash_columns,
            } => {
                assert_eq!(*max_batch_size, 100);
                assert_eq!(hash_columns.len(), 2);
                assert_eq!(hash_columns[1].as_str(), "b");
            }
            other => panic!("unexpected strategy {other:?}"),
        }
        assert!(matches!(ctx.output, OutputStrategy::DirectExport { .. }));
    }

    #[test]
    fn test_resolve_column_strategy() {
        let mut s = settings();
        s.batch_column = Some("month".to_string());
        let ctx = RunContext::resolve(&s).unwrap();
        assert_eq!(
            ctx.batching,
            BatchStrategy::Column {
                column: ColumnName::new("month").unwrap()
            }
        );
    }

    #[test]
    fn test_resolve_rejects_invalid() {
        let mut s = settings();
        s.input_query = Some("SELECT 1".to_string());
        assert!(matches!(
            RunContext::resolve(&s),
            Err(ExtractError::Configuration(_))
        ));
    }

    #[test]
    fn test_initial_state_per_source() {
        let ctx = RunContext::resolve(&settings()).unwrap();
        let state = ctx.initial_state();
        assert_eq!(state.count_mode, CountMode::Metadata);
        assert!(state.with_clause.is_none());

        let mut s = settings();
        s.input_table = None;
        s.input_view = Some("p.d.v".to_string());
        let state = RunContext::resolve(&s).unwrap().initial_state();
        assert_eq!(state.count_mode, CountMode::Query);

        let mut s = settings();
        s.input_table = None;
        s.input_query = Some("SELECT 1 AS x".to_string());
        s.limit = Some(7);
        let state = RunContext::resolve(&s).unwrap().initial_state();
        assert_eq!(state.relation, Relation::QueryCte);
        assert_eq!(state.count_mode, CountMode::Query);
        assert_eq!(state.limit, Some(7));
        assert!(state.with_clause.unwrap().starts_with("WITH data AS ("));
    }

    #[test]
    fn test_staged_transition() {
        let mut s = settings();
        s.input_table = None;
        s.input_query = Some("SELECT 1 AS x".to_string());
        s.limit = Some(7);
        let state = RunContext::resolve(&s).unwrap().initial_state();
        let staging = TableRef::new("p.scratch.tmp").unwrap();
        let staged = state.staged(staging.clone(), true);
        assert_eq!(staged.relation, Relation::Table(staging.clone()));
        assert!(staged.with_clause.is_none());
        assert!(staged.limit.is_none());
        assert_eq!(staged.count_mode, CountMode::Metadata);
        assert!(staged.hash_staged);
        assert_eq!(staged.staging, Some(staging));
    }

    #[test]
    fn test_filename_substitution() {
        let ctx = RunContext::resolve(&settings()).unwrap();
        assert_eq!(ctx.filename(Some(&BatchId::Shard(4))), "out-4.jsonl");
        assert_eq!(
            ctx.filename(Some(&BatchId::Value("2023-01".into()))),
            "out-2023-01.jsonl"
        );
        assert_eq!(ctx.filename(None), "out-{batch}.jsonl");
        assert_eq!(
            ctx.storage_uri("gs://b/p/", Some(&BatchId::Shard(0))),
            "gs://b/p/out-0.jsonl"
        );
    }
}
