//! Batch planning
//!
//! Produces the ordered batch list exactly once per run. Its length is the
//! shard-count divisor used by every shard predicate.

use super::context::{BatchStrategy, CountMode, WorkingState};
use super::sql::{Relation, Select, Statement};
use crate::adapters::warehouse::WarehouseClient;
use crate::domain::{BatchId, ColumnName, ExtractError, LiteralKind, Result};
use serde_json::Value;
use std::time::Instant;

/// Number of shards needed for `row_count` rows of at most `max_batch_size`
///
/// ```
/// use bqextract::core::planner::shard_count;
///
/// assert_eq!(shard_count(250, 100).unwrap(), 3);
/// assert_eq!(shard_count(0, 100).unwrap(), 0);
/// assert!(shard_count(250, 0).is_err());
/// ```
///
/// # Errors
///
/// Returns [`ExtractError::Configuration`] when `max_batch_size` is zero.
pub fn shard_count(row_count: u64, max_batch_size: u64) -> Result<u64> {
    if max_batch_size == 0 {
        return Err(ExtractError::Configuration(
            "Maximum batch size must be positive".to_string(),
        ));
    }
    Ok(row_count.div_ceil(max_batch_size))
}

/// Shard identifiers `0..num_shards`
pub fn shard_ids(num_shards: u64) -> Vec<BatchId> {
    (0..num_shards).map(BatchId::Shard).collect()
}

/// Determines the batch list for batched runs
pub struct BatchPlanner<'a> {
    client: &'a dyn WarehouseClient,
}

impl<'a> BatchPlanner<'a> {
    pub fn new(client: &'a dyn WarehouseClient) -> Self {
        Self { client }
    }

    /// Plans batches for `strategy` against the current working state
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Planning`] for an unbatched strategy or for
    /// distinct values that cannot identify a batch, and surfaces warehouse
    /// errors unchanged.
    pub async fn plan(&self, strategy: &BatchStrategy, state: &WorkingState) -> Result<Vec<BatchId>> {
        let start = Instant::now();
        let batches = match strategy {
            BatchStrategy::Column { column } => self.distinct_values(column, state).await?,
            BatchStrategy::Shard { max_batch_size, .. } => {
                let rows = self.row_count(state).await?;
                let shards = shard_count(rows, *max_batch_size)?;
                tracing::info!(
                    row_count = rows,
                    max_batch_size = *max_batch_size,
                    num_shards = shards,
                    "Computed shard count"
                );
                shard_ids(shards)
            }
            BatchStrategy::Unbatched => {
                return Err(ExtractError::Planning(
                    "Batch planning requested for an unbatched run".to_string(),
                ))
            }
        };

        tracing::info!(
            batch_count = batches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batches planned"
        );
        Ok(batches)
    }

    /// Total rows of the working source, by metadata or count query
    ///
    /// The row limit is not applied here; it caps each batch query instead.
    pub async fn row_count(&self, state: &WorkingState) -> Result<u64> {
        match (state.count_mode, &state.relation) {
            (CountMode::Metadata, Relation::Table(table)) => {
                let metadata = self.client.table_metadata(table).await?;
                tracing::debug!(table = %table, row_count = metadata.row_count, "Row count from metadata");
                Ok(metadata.row_count)
            }
            _ => {
                let select = Select::count_from(state.relation.clone())
                    .with_clause(state.with_clause.as_deref());
                let statement = Statement::query(&select);
                tracing::debug!(sql = %statement, "Counting rows");
                let result = self.client.execute_query(&statement).await?;
                let value = result.first_column().first().copied().cloned();
                parse_count(value)
            }
        }
    }

    async fn distinct_values(
        &self,
        column: &ColumnName,
        state: &WorkingState,
    ) -> Result<Vec<BatchId>> {
        let select = Select::distinct_from(column.clone(), state.relation.clone())
            .with_clause(state.with_clause.as_deref());
        let statement = Statement::query(&select);
        tracing::debug!(sql = %statement, "Listing distinct batch values");

        let result = self.client.execute_query(&statement).await?;
        let kind = result
            .schema
            .first()
            .and_then(|c| LiteralKind::from_type_name(&c.data_type));
        result
            .first_column()
            .into_iter()
            .map(|value| distinct_value(column, kind, value))
            .collect()
    }
}

fn parse_count(value: Option<Value>) -> Result<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid_count(&n.to_string())),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid_count(&s)),
        other => Err(ExtractError::Planning(format!(
            "Count query returned no usable value: {other:?}"
        ))),
    }
}

fn invalid_count(raw: &str) -> ExtractError {
    ExtractError::Planning(format!("Count query returned a non-integer value '{raw}'"))
}

/// Batch id for one distinct value
///
/// `kind` comes from the result schema; without it the JSON type decides.
fn distinct_value(
    column: &ColumnName,
    kind: Option<LiteralKind>,
    value: &Value,
) -> Result<BatchId> {
    let (raw, inferred) = match value {
        Value::Null => {
            return Err(ExtractError::Planning(format!(
                "Batch column {column} contains NULL values, which cannot identify a batch"
            )))
        }
        Value::String(s) => (s.clone(), None),
        Value::Bool(b) => (b.to_string(), Some(LiteralKind::Bool)),
        Value::Number(n) if n.is_i64() || n.is_u64() => (n.to_string(), Some(LiteralKind::Int64)),
        Value::Number(n) => (n.to_string(), Some(LiteralKind::Float64)),
        other => {
            return Err(ExtractError::Planning(format!(
                "Batch column {column} contains a non-scalar value {other}"
            )))
        }
    };
    if raw.trim().is_empty() {
        return Err(ExtractError::Planning(format!(
            "Batch column {column} contains an empty value"
        )));
    }
    Ok(match kind.or(inferred) {
        Some(kind) => BatchId::Typed(kind, raw),
        None => BatchId::Value(raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(0, 100 => 0; "empty source")]
    #[test_case(1, 100 => 1; "single row")]
    #[test_case(100, 100 => 1; "exact multiple")]
    #[test_case(101, 100 => 2; "one over")]
    #[test_case(250, 100 => 3; "partial last shard")]
    #[test_case(7, 1 => 7; "one row per shard")]
    fn test_shard_count(rows: u64, max: u64) -> u64 {
        shard_count(rows, max).unwrap()
    }

    #[test]
    fn test_shard_count_rejects_zero_batch_size() {
        assert!(matches!(
            shard_count(250, 0),
            Err(ExtractError::Configuration(_))
        ));
        assert!(matches!(
            shard_count(0, 0),
            Err(ExtractError::Configuration(_))
        ));
    }

    #[test]
    fn test_shard_ids_contiguous() {
        assert_eq!(
            shard_ids(3),
            vec![BatchId::Shard(0), BatchId::Shard(1), BatchId::Shard(2)]
        );
        assert!(shard_ids(0).is_empty());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some(json!(250))).unwrap(), 250);
        assert_eq!(parse_count(Some(json!("42"))).unwrap(), 42);
        assert!(parse_count(Some(json!("abc"))).is_err());
        assert!(parse_count(Some(json!(-1))).is_err());
        assert!(parse_count(None).is_err());
    }

    #[test]
    fn test_distinct_value_conversion() {
        let column = ColumnName::new("month").unwrap();
        assert_eq!(
            distinct_value(&column, None, &json!("2023-01")).unwrap(),
            BatchId::Value("2023-01".to_string())
        );
        assert!(matches!(
            distinct_value(&column, None, &Value::Null),
            Err(ExtractError::Planning(_))
        ));
        assert!(distinct_value(&column, None, &json!(" ")).is_err());
        assert!(distinct_value(&column, None, &json!(["a"])).is_err());
    }

    #[test]
    fn test_distinct_value_keeps_column_type() {
        let column = ColumnName::new("year").unwrap();
        assert_eq!(
            distinct_value(&column, Some(LiteralKind::Int64), &json!(2023)).unwrap(),
            BatchId::Typed(LiteralKind::Int64, "2023".to_string())
        );
        assert_eq!(
            distinct_value(&column, None, &json!(2023)).unwrap(),
            BatchId::Typed(LiteralKind::Int64, "2023".to_string())
        );
        assert_eq!(
            distinct_value(&column, None, &json!(true)).unwrap(),
            BatchId::Typed(LiteralKind::Bool, "true".to_string())
        );
        assert_eq!(
            distinct_value(&column, Some(LiteralKind::Numeric), &json!("12.30")).unwrap(),
            BatchId::Typed(LiteralKind::Numeric, "12.30".to_string())
        );
    }
}
