//! BigQuery REST API models
//!
//! Request and response structures for the `jobs.query`,
//! `jobs.getQueryResults` and `tables.get` endpoints, plus schema-driven
//! decoding of the `{"f": [{"v": ...}]}` row encoding into [`Record`]s.

use crate::adapters::warehouse::Column;
use crate::domain::{Record, Result, WarehouseError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// `jobs.query` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub timeout_ms: u64,
    pub format_options: FormatOptions,
}

/// Result encoding options
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    /// Encode TIMESTAMP values as integer microseconds
    pub use_int64_timestamp: bool,
}

/// Response of `jobs.query` and `jobs.getQueryResults`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_reference: Option<JobReference>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
    pub total_rows: Option<String>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

/// Identifies a query job for polling and pagination
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

/// Result or table schema
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// One schema field; `RECORD` fields nest
#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableFieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("REPEATED"))
    }
}

/// Encoded row
#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// Encoded cell
#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// Subset of the `tables.get` resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub num_rows: Option<String>,
}

/// Error envelope returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

/// Individual job or request error
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorProto {
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl std::fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => write!(f, "{reason}: {message}"),
            (None, Some(message)) => write!(f, "{message}"),
            (Some(reason), None) => write!(f, "{reason}"),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

impl TableSchema {
    /// Flat column list of the top-level fields
    pub fn columns(&self) -> Vec<Column> {
        self.fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                data_type: f.field_type.to_ascii_uppercase(),
            })
            .collect()
    }

    /// Decodes one encoded row against this schema
    pub fn decode_row(&self, row: &TableRow) -> Result<Record> {
        decode_fields(&self.fields, &row.f)
    }
}

fn decode_fields(fields: &[TableFieldSchema], cells: &[TableCell]) -> Result<Record> {
    if fields.len() != cells.len() {
        return Err(WarehouseError::InvalidResponse(format!(
            "Row has {} cells but the schema has {} fields",
            cells.len(),
            fields.len()
        ))
        .into());
    }
    let mut record = Record::new();
    for (field, cell) in fields.iter().zip(cells) {
        record.insert(field.name.clone(), decode_field(field, &cell.v)?);
    }
    Ok(record)
}

fn decode_field(field: &TableFieldSchema, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if !field.is_repeated() {
        return decode_scalar(field, value);
    }
    let Value::Array(items) = value else {
        return Err(invalid(field, value));
    };
    items
        .iter()
        .map(|item| decode_scalar(field, item.get("v").unwrap_or(&Value::Null)))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn decode_scalar(field: &TableFieldSchema, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match field.field_type.to_ascii_uppercase().as_str() {
        "RECORD" | "STRUCT" => {
            let cells: Vec<TableCell> = value
                .get("f")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .ok_or_else(|| invalid(field, value))?;
            decode_fields(&field.fields, &cells).map(Value::Object)
        }
        "INT64" | "INTEGER" => {
            let raw = as_str(field, value)?;
            Ok(raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())))
        }
        "FLOAT64" | "FLOAT" => {
            let raw = as_str(field, value)?;
            Ok(raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())))
        }
        "BOOL" | "BOOLEAN" => match as_str(field, value)? {
            raw if raw.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            raw if raw.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(invalid(field, value)),
        },
        "TIMESTAMP" => {
            let raw = as_str(field, value)?;
            Ok(Value::String(format_timestamp(raw).unwrap_or_else(|| raw.to_string())))
        }
        _ => Ok(Value::String(as_str(field, value)?.to_string())),
    }
}

/// Microsecond (or legacy float-second) epoch timestamps as RFC 3339
fn format_timestamp(raw: &str) -> Option<String> {
    let micros = match raw.parse::<i64>() {
        Ok(micros) => micros,
        Err(_) => {
            let seconds = raw.parse::<f64>().ok()?;
            (seconds * 1_000_000.0).round() as i64
        }
    };
    DateTime::<Utc>::from_timestamp_micros(micros).map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn as_str<'v>(field: &TableFieldSchema, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| invalid(field, value))
}

fn invalid(field: &TableFieldSchema, value: &Value) -> crate::domain::ExtractError {
    WarehouseError::InvalidResponse(format!(
        "Unexpected encoding for column {} ({}): {value}",
        field.name, field.field_type
    ))
    .into()
}
