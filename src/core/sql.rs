//! GoogleSQL statement construction
//!
//! Structural SQL is assembled from typed pieces; anything derived from
//! configuration or data is either a validated identifier ([`TableRef`],
//! [`ColumnName`]) rendered through [`quote_identifier`], or a literal rendered
//! through [`string_literal`]. Nothing else is interpolated.

use crate::domain::{ColumnName, LiteralKind, TableRef};
use std::fmt;

/// Wraps a validated identifier in backticks
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', ""))
}

/// Renders a GoogleSQL string literal
///
/// ```
/// use bqextract::core::sql::string_literal;
///
/// assert_eq!(string_literal("it's"), r"'it\'s'");
/// assert_eq!(string_literal(r"a\b"), r"'a\\b'");
/// ```
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\x00"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Renders a numeric or boolean literal, `None` when `raw` is not a value of `kind`
///
/// ```
/// use bqextract::core::sql::typed_literal;
/// use bqextract::domain::LiteralKind;
///
/// assert_eq!(typed_literal(LiteralKind::Int64, "2023").as_deref(), Some("2023"));
/// assert_eq!(typed_literal(LiteralKind::Numeric, "12.30").as_deref(), Some("NUMERIC '12.30'"));
/// assert_eq!(typed_literal(LiteralKind::Bool, "1"), None);
/// ```
pub fn typed_literal(kind: LiteralKind, raw: &str) -> Option<String> {
    let raw = raw.trim();
    match kind {
        LiteralKind::Int64 => raw.parse::<i64>().ok().map(|v| v.to_string()),
        LiteralKind::Float64 => raw
            .parse::<f64>()
            .ok()
            .map(|_| format!("CAST({} AS FLOAT64)", string_literal(raw))),
        LiteralKind::Numeric | LiteralKind::BigNumeric => {
            let numeric = !raw.is_empty()
                && raw.chars().any(|c| c.is_ascii_digit())
                && raw
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
            let keyword = if kind == LiteralKind::Numeric {
                "NUMERIC"
            } else {
                "BIGNUMERIC"
            };
            numeric.then(|| format!("{keyword} '{raw}'"))
        }
        LiteralKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" => Some("TRUE".to_string()),
            "false" => Some("FALSE".to_string()),
            _ => None,
        },
    }
}

/// Name of the common table expression wrapping an ad-hoc source query
pub const QUERY_CTE_NAME: &str = "data";

/// What a generated `SELECT` reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    /// A persisted table or view
    Table(TableRef),
    /// The `data` common table expression
    QueryCte,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Table(table) => write!(f, "{}", quote_identifier(table.as_str())),
            Relation::QueryCte => write!(f, "{QUERY_CTE_NAME}"),
        }
    }
}

/// `WITH data AS (...)` prefix for query sources
pub fn query_with_clause(query: &str) -> String {
    format!("WITH {QUERY_CTE_NAME} AS (\n{}\n)", query.trim().trim_end_matches(';'))
}

/// A `SELECT` over a single relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    with_clause: Option<String>,
    projection: Projection,
    from: Relation,
    predicate: Option<String>,
    order_by: Option<ColumnName>,
    limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    All {
        except: Vec<ColumnName>,
        extra: Option<(String, ColumnName)>,
    },
    Distinct(ColumnName),
    Count,
}

impl Select {
    /// `SELECT * FROM <relation>`
    pub fn all_from(from: Relation) -> Self {
        Self {
            with_clause: None,
            projection: Projection::All {
                except: Vec::new(),
                extra: None,
            },
            from,
            predicate: None,
            order_by: None,
            limit: None,
        }
    }

    /// `SELECT DISTINCT <column> FROM <relation> ORDER BY <column>`
    pub fn distinct_from(column: ColumnName, from: Relation) -> Self {
        Self {
            projection: Projection::Distinct(column.clone()),
            order_by: Some(column),
            ..Self::all_from(from)
        }
    }

    /// `SELECT COUNT(*) FROM <relation>`
    pub fn count_from(from: Relation) -> Self {
        Self {
            projection: Projection::Count,
            ..Self::all_from(from)
        }
    }

    /// Prefix the statement with a `WITH` clause
    pub fn with_clause(mut self, with_clause: Option<&str>) -> Self {
        self.with_clause = with_clause.map(str::to_string);
        self
    }

    /// Drop a column from `SELECT *`
    pub fn except(mut self, column: ColumnName) -> Self {
        if let Projection::All { except, .. } = &mut self.projection {
            if !except.contains(&column) {
                except.push(column);
            }
        }
        self
    }

    /// Append a computed column to `SELECT *`
    pub fn with_computed(mut self, expression: String, alias: ColumnName) -> Self {
        if let Projection::All { extra, .. } = &mut self.projection {
            *extra = Some((expression, alias));
        }
        self
    }

    /// Restrict rows with a boolean predicate
    pub fn filter(mut self, predicate: Option<String>) -> Self {
        self.predicate = predicate;
        self
    }

    /// Cap the number of rows
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Renders the statement text
    pub fn render(&self) -> String {
        let mut sql = String::new();
        if let Some(with_clause) = &self.with_clause {
            sql.push_str(with_clause);
            sql.push('\n');
        }

        let projection = match &self.projection {
            Projection::All { except, extra } => {
                let mut p = "*".to_string();
                if !except.is_empty() {
                    let cols: Vec<String> =
                        except.iter().map(|c| quote_identifier(c.as_str())).collect();
                    p.push_str(&format!(" EXCEPT({})", cols.join(", ")));
                }
                if let Some((expression, alias)) = extra {
                    p.push_str(&format!(", {expression} AS {}", quote_identifier(alias.as_str())));
                }
                p
            }
            Projection::Distinct(column) => format!("DISTINCT {}", quote_identifier(column.as_str())),
            Projection::Count => "COUNT(*)".to_string(),
        };

        sql.push_str(&format!("SELECT {projection}\nFROM {}", self.from));
        if let Some(predicate) = &self.predicate {
            sql.push_str(&format!("\nWHERE {predicate}"));
        }
        if let Some(column) = &self.order_by {
            sql.push_str(&format!("\nORDER BY {}", quote_identifier(column.as_str())));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!("\nLIMIT {limit}"));
        }
        sql
    }
}

/// A complete statement ready to send to the warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
}

impl Statement {
    /// A plain query
    pub fn query(select: &Select) -> Self {
        Self {
            sql: select.render(),
        }
    }

    /// `CREATE OR REPLACE TABLE ... [CLUSTER BY ...] AS <select>`
    pub fn create_table_as(table: &TableRef, cluster_by: Option<&ColumnName>, select: &Select) -> Self {
        let mut sql = format!("CREATE OR REPLACE TABLE {}", quote_identifier(table.as_str()));
        if let Some(column) = cluster_by {
            sql.push_str(&format!("\nCLUSTER BY {}", quote_identifier(column.as_str())));
        }
        sql.push_str("\nAS\n");
        sql.push_str(&select.render());
        Self { sql }
    }

    /// `EXPORT DATA OPTIONS(...) AS (<select>)` writing newline-delimited JSON
    pub fn export_data(uri: &str, select: &Select) -> Self {
        let sql = format!(
            "EXPORT DATA\n  OPTIONS (\n    uri = {},\n    format = 'JSON',\n    overwrite = true)\nAS (\n{}\n)",
            string_literal(uri),
            select.render()
        );
        Self { sql }
    }

    /// Statement text
    pub fn as_sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Relation {
        Relation::Table(TableRef::new(name).unwrap())
    }

    fn col(name: &str) -> ColumnName {
        ColumnName::new(name).unwrap()
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(string_literal("plain"), "'plain'");
        assert_eq!(string_literal("a'b"), r"'a\'b'");
        assert_eq!(string_literal("\"q\""), r#"'\"q\"'"#);
        assert_eq!(string_literal("line\nbreak"), r"'line\nbreak'");
        assert_eq!(string_literal("x' OR '1'='1"), r"'x\' OR \'1\'=\'1'");
    }

    #[test]
    fn test_select_all() {
        let sql = Select::all_from(table("p.d.t")).render();
        assert_eq!(sql, "SELECT *\nFROM `p.d.t`");
    }

    #[test]
    fn test_select_except_filter_limit() {
        let sql = Select::all_from(table("p.d.t"))
            .except(col("hashcol"))
            .except(col("hashcol"))
            .filter(Some("MOD(`hashcol`, 3) = 1".to_string()))
            .limit(Some(10))
            .render();
        assert_eq!(
            sql,
            "SELECT * EXCEPT(`hashcol`)\nFROM `p.d.t`\nWHERE MOD(`hashcol`, 3) = 1\nLIMIT 10"
        );
    }

    #[test]
    fn test_select_with_clause_and_cte() {
        let with = query_with_clause("SELECT 1 AS x;");
        let sql = Select::count_from(Relation::QueryCte)
            .with_clause(Some(&with))
            .render();
        assert_eq!(sql, "WITH data AS (\nSELECT 1 AS x\n)\nSELECT COUNT(*)\nFROM data");
    }

    #[test]
    fn test_select_distinct_ordered() {
        let sql = Select::distinct_from(col("month"), table("d.t")).render();
        assert_eq!(sql, "SELECT DISTINCT `month`\nFROM `d.t`\nORDER BY `month`");
    }

    #[test]
    fn test_computed_column() {
        let sql = Select::all_from(table("d.t"))
            .with_computed("ABS(1)".to_string(), col("hashcol"))
            .render();
        assert_eq!(sql, "SELECT *, ABS(1) AS `hashcol`\nFROM `d.t`");
    }

    #[test]
    fn test_create_table_as() {
        let select = Select::all_from(table("d.src")).limit(Some(5));
        let stmt = Statement::create_table_as(
            &TableRef::new("d.tmp").unwrap(),
            Some(&col("hashcol")),
            &select,
        );
        assert_eq!(
            stmt.as_sql(),
            "CREATE OR REPLACE TABLE `d.tmp`\nCLUSTER BY `hashcol`\nAS\nSELECT *\nFROM `d.src`\nLIMIT 5"
        );

        let unclustered = Statement::create_table_as(&TableRef::new("d.tmp").unwrap(), None, &select);
        assert!(!unclustered.as_sql().contains("CLUSTER BY"));
    }

    #[test]
    fn test_export_data() {
        let select = Select::all_from(table("d.t"));
        let stmt = Statement::export_data("gs://bucket/out-*.json", &select);
        assert!(stmt.as_sql().starts_with("EXPORT DATA\n  OPTIONS (\n    uri = 'gs://bucket/out-*.json',"));
        assert!(stmt.as_sql().contains("format = 'JSON'"));
        assert!(stmt.as_sql().contains("overwrite = true"));
        assert!(stmt.as_sql().ends_with("AS (\nSELECT *\nFROM `d.t`\n)"));
    }
}
