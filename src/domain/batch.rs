//! Batch identifiers and exported records

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single exported row, keyed by column name
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier of one batch of a partitioned export
///
/// Shards are numbered `0..num_shards`; column batches carry the literal
/// distinct value of the batch column, typed when the column is numeric or
/// boolean. The [`Display`](fmt::Display) form is the raw value and is what
/// gets substituted into filename patterns and written to the batch manifest.
///
/// # Examples
///
/// ```
/// use bqextract::domain::{BatchId, LiteralKind};
///
/// assert_eq!(BatchId::Shard(3).to_string(), "3");
/// assert_eq!(BatchId::Value("2023-01".into()).to_string(), "2023-01");
///
/// let year = BatchId::Typed(LiteralKind::Int64, "2023".into());
/// assert_eq!(year.to_string(), "2023");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BatchId {
    /// Hash shard index
    Shard(u64),
    /// Distinct value of a string-typed batch column
    ///
    /// Also used for DATE, DATETIME, TIME and TIMESTAMP columns, whose
    /// string literals coerce in comparisons.
    Value(String),
    /// Distinct value of a numeric or boolean batch column, as returned
    Typed(LiteralKind, String),
}

/// Warehouse types whose values cannot be compared against a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LiteralKind {
    Int64,
    Float64,
    Numeric,
    BigNumeric,
    Bool,
}

impl LiteralKind {
    /// Kind for a warehouse type name; `None` for string-comparable types
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name.trim().to_ascii_uppercase().as_str() {
            "INT64" | "INTEGER" => Some(LiteralKind::Int64),
            "FLOAT64" | "FLOAT" => Some(LiteralKind::Float64),
            "NUMERIC" | "DECIMAL" => Some(LiteralKind::Numeric),
            "BIGNUMERIC" | "BIGDECIMAL" => Some(LiteralKind::BigNumeric),
            "BOOL" | "BOOLEAN" => Some(LiteralKind::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchId::Shard(index) => write!(f, "{index}"),
            BatchId::Value(value) | BatchId::Typed(_, value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_ordering() {
        let mut ids = vec![BatchId::Shard(2), BatchId::Shard(0), BatchId::Shard(1)];
        ids.sort();
        assert_eq!(ids, vec![BatchId::Shard(0), BatchId::Shard(1), BatchId::Shard(2)]);
    }

    #[test]
    fn test_display_is_raw() {
        assert_eq!(BatchId::Shard(10).to_string(), "10");
        assert_eq!(BatchId::Value("it's".into()).to_string(), "it's");
        assert_eq!(
            BatchId::Typed(LiteralKind::Bool, "true".into()).to_string(),
            "true"
        );
    }

    #[test]
    fn test_literal_kind_from_type_name() {
        assert_eq!(LiteralKind::from_type_name("INTEGER"), Some(LiteralKind::Int64));
        assert_eq!(LiteralKind::from_type_name("int64"), Some(LiteralKind::Int64));
        assert_eq!(LiteralKind::from_type_name("BOOLEAN"), Some(LiteralKind::Bool));
        assert_eq!(LiteralKind::from_type_name("NUMERIC"), Some(LiteralKind::Numeric));
        assert_eq!(LiteralKind::from_type_name("STRING"), None);
        assert_eq!(LiteralKind::from_type_name("DATE"), None);
    }
}
