//! Domain identifier types with validation
//!
//! Newtype wrappers for the warehouse identifiers that flow from configuration
//! into generated SQL. Validation happens once, at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fully or partially qualified table reference
///
/// Accepts `table`, `dataset.table` or `project.dataset.table`. Project ids
/// may themselves contain dots (domain-scoped projects such as
/// `example.com:analytics`), so the reference is split from the right.
///
/// # Examples
///
/// ```
/// use bqextract::domain::ids::TableRef;
/// use std::str::FromStr;
///
/// let table = TableRef::from_str("my-project.sales.orders").unwrap();
/// assert_eq!(table.table(), "orders");
/// assert_eq!(table.dataset(), Some("sales"));
/// assert_eq!(table.project(), Some("my-project"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef(String);

impl TableRef {
    /// Creates a new TableRef from a string
    pub fn new(reference: impl Into<String>) -> Result<Self, String> {
        let reference = reference.into();
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err("Table reference cannot be empty".to_string());
        }
        if trimmed.contains('`') || trimmed.contains(char::is_whitespace) {
            return Err(format!(
                "Table reference '{trimmed}' must not contain backticks or whitespace"
            ));
        }
        if trimmed.rsplitn(3, '.').any(str::is_empty) {
            return Err(format!("Table reference '{trimmed}' has an empty component"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the reference as written
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table name component
    pub fn table(&self) -> &str {
        self.parts().0
    }

    /// Dataset component, if qualified
    pub fn dataset(&self) -> Option<&str> {
        self.parts().1
    }

    /// Project component, if fully qualified
    pub fn project(&self) -> Option<&str> {
        self.parts().2
    }

    fn parts(&self) -> (&str, Option<&str>, Option<&str>) {
        let mut it = self.0.rsplitn(3, '.');
        let table = it.next().unwrap_or_default();
        let dataset = it.next();
        let project = it.next();
        (table, dataset, project)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TableRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Column name newtype wrapper
///
/// Restricted to plain GoogleSQL identifiers so that it can be used inside
/// `EXCEPT(...)` lists and `CAST(... AS STRING)` without further escaping.
///
/// # Examples
///
/// ```
/// use bqextract::domain::ids::ColumnName;
///
/// assert!(ColumnName::new("customer_id").is_ok());
/// assert!(ColumnName::new("customer id").is_err());
/// assert!(ColumnName::new("1st").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnName(String);

impl ColumnName {
    /// Creates a new ColumnName, trimming surrounding whitespace
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Column name cannot be empty".to_string());
        }
        let mut chars = trimmed.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_start || !valid_rest {
            return Err(format!(
                "Invalid column name '{trimmed}'. Expected letters, digits and underscores, not starting with a digit"
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wraps a name known at compile time to be a valid identifier
    pub(crate) fn trusted(name: &'static str) -> Self {
        Self(name.to_string())
    }

    /// Returns the column name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ColumnName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ColumnName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
