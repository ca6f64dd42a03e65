//! Domain error types
//!
//! This module defines the error hierarchy for bqextract.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main bqextract error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Invalid or contradictory options, raised before any warehouse call
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Warehouse rejected or failed a request
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Batch planning produced an unusable batch list
    #[error("Planning error: {0}")]
    Planning(String),

    /// Record sink failures
    #[error("Sink error: {0}")]
    Sink(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ExtractError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ExtractError::Configuration(_) => 2,
            ExtractError::Warehouse(_) => 4,
            _ => 5,
        }
    }
}

/// Warehouse-specific errors
///
/// Errors that occur when talking to the query engine.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// Failed to reach the warehouse API
    #[error("Failed to connect to warehouse: {0}")]
    ConnectionFailed(String),

    /// Credentials were rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The query job finished with an error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Table or job not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response could not be interpreted
    #[error("Invalid response from warehouse: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// The job did not complete within the configured timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl WarehouseError {
    /// Whether this error reports a missing table
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WarehouseError::NotFound(_) | WarehouseError::ClientError { status: 404, .. }
        )
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        ExtractError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ExtractError {
    fn from(err: toml::de::Error) -> Self {
        ExtractError::Configuration(format!("TOML parse error: {err}"))
    }
}
