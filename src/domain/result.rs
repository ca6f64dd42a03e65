//! Result type alias for bqextract

use super::errors::ExtractError;

/// Result type alias for bqextract operations
///
/// # Examples
///
/// ```
/// use bqextract::domain::result::Result;
/// use bqextract::domain::errors::ExtractError;
///
/// fn failing_function() -> Result<()> {
///     Err(ExtractError::Configuration("bad option".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ExtractError>;
