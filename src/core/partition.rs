//! Partition predicate construction
//!
//! Both output strategies select a batch's rows through [`batch_predicate`], and
//! the staging table stores exactly the expression [`hash_expression`] returns,
//! so a shard index selects the same rows with or without staging.

use super::context::{BatchStrategy, WorkingState};
use super::sql::{quote_identifier, string_literal, typed_literal};
use crate::domain::{BatchId, ColumnName, ExtractError, LiteralKind, Result};

/// Column holding the precomputed hash on a staging table
pub const HASH_COLUMN: &str = "hashcol";

/// Column name of [`HASH_COLUMN`]
pub fn hash_column() -> ColumnName {
    ColumnName::trusted(HASH_COLUMN)
}

/// Deterministic, order-sensitive fingerprint of a row's hash columns
///
/// ```
/// use bqextract::core::partition::hash_expression;
/// use bqextract::domain::ColumnName;
///
/// let cols = vec![ColumnName::new("id").unwrap()];
/// assert_eq!(
///     hash_expression(&cols).unwrap(),
///     "ABS(FARM_FINGERPRINT(CONCAT(IFNULL(CAST(`id` AS STRING), ''))))"
/// );
/// ```
pub fn hash_expression(hash_columns: &[ColumnName]) -> Result<String> {
    if hash_columns.is_empty() {
        return Err(ExtractError::Configuration(
            "At least one hash column is required for sharding".to_string(),
        ));
    }
    let casts: Vec<String> = hash_columns
        .iter()
        .map(|c| format!("IFNULL(CAST({} AS STRING), '')", quote_identifier(c.as_str())))
        .collect();
    Ok(format!("ABS(FARM_FINGERPRINT(CONCAT({})))", casts.join(", ")))
}

/// `MOD(<hash>, num_shards) = shard`
///
/// With `hash_staged` the precomputed staging column is referenced, otherwise
/// the hash is recomputed inline from `hash_columns`.
pub fn shard_predicate(
    hash_staged: bool,
    hash_columns: &[ColumnName],
    num_shards: u64,
    shard: u64,
) -> Result<String> {
    if num_shards == 0 {
        return Err(ExtractError::Configuration(
            "Shard count must be positive".to_string(),
        ));
    }
    let hash = if hash_staged {
        if hash_columns.is_empty() {
            return Err(ExtractError::Configuration(
                "At least one hash column is required for sharding".to_string(),
            ));
        }
        quote_identifier(HASH_COLUMN)
    } else {
        hash_expression(hash_columns)?
    };
    if shard >= num_shards {
        return Err(ExtractError::Planning(format!(
            "Shard index {shard} is out of range for {num_shards} shards"
        )));
    }
    Ok(format!("MOD({hash}, {num_shards}) = {shard}"))
}

/// `<batch_column> = '<value>'`
pub fn column_predicate(batch_column: &ColumnName, value: &str) -> Result<String> {
    if value.trim().is_empty() {
        return Err(ExtractError::Planning(format!(
            "Empty batch value for column {batch_column}"
        )));
    }
    Ok(format!(
        "{} = {}",
        quote_identifier(batch_column.as_str()),
        string_literal(value)
    ))
}

/// `<batch_column> = <literal>` for a numeric or boolean batch column
pub fn typed_column_predicate(
    batch_column: &ColumnName,
    kind: LiteralKind,
    raw: &str,
) -> Result<String> {
    let literal = typed_literal(kind, raw).ok_or_else(|| {
        ExtractError::Planning(format!(
            "Batch value '{raw}' of column {batch_column} is not a valid {kind:?} literal"
        ))
    })?;
    Ok(format!(
        "{} = {literal}",
        quote_identifier(batch_column.as_str())
    ))
}

/// Predicate selecting `batch`, given the full planned batch list length
pub fn batch_predicate(
    strategy: &BatchStrategy,
    state: &WorkingState,
    batch: &BatchId,
    batch_count: usize,
) -> Result<String> {
    match (strategy, batch) {
        (BatchStrategy::Shard { hash_columns, .. }, BatchId::Shard(index)) => {
            shard_predicate(state.hash_staged, hash_columns, batch_count as u64, *index)
        }
        (BatchStrategy::Column { column }, BatchId::Value(value)) => {
            column_predicate(column, value)
        }
        (BatchStrategy::Column { column }, BatchId::Typed(kind, raw)) => {
            typed_column_predicate(column, *kind, raw)
        }
        (BatchStrategy::Unbatched, _) => Err(ExtractError::Planning(
            "Batch predicate requested for an unbatched run".to_string(),
        )),
        (_, batch) => Err(ExtractError::Planning(format!(
            "Batch identifier {batch} does not match the configured batching strategy"
        ))),
    }
}
