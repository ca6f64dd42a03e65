//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ExtractConfig, HashColumnsSpec};
use super::secret::secret_string;
use crate::domain::errors::ExtractError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`ExtractConfig`]
/// 4. Applies environment variable overrides (`BQEXTRACT_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Every failure is reported as [`ExtractError::Configuration`].
///
/// # Examples
///
/// ```no_run
/// use bqextract::config::loader::load_config;
///
/// let config = load_config("bqextract.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExtractConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExtractError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExtractError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration text, applying the same steps as [`load_config`]
pub fn parse_config(contents: &str) -> Result<ExtractConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ExtractConfig = toml::from_str(&contents)
        .map_err(|e| ExtractError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ExtractError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("environment variable pattern is valid")
    })
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(ExtractError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ExtractError::Configuration(format!("Invalid value '{value}' for environment variable {name}"))
    })
}

/// Applies environment variable overrides using the `BQEXTRACT_*` prefix
///
/// Variables follow the pattern `BQEXTRACT_<SECTION>_<KEY>`, for example
/// `BQEXTRACT_EXTRACT_LIMIT` or `BQEXTRACT_WAREHOUSE_ACCESS_TOKEN`.
fn apply_env_overrides(config: &mut ExtractConfig) -> Result<()> {
    let extract = &mut config.extract;

    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_BILLING_PROJECT") {
        extract.billing_project = val;
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_FILENAME_PATTERN") {
        extract.filename_pattern = val;
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_TEMP_TABLE") {
        extract.temp_table = Some(val);
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_LIMIT") {
        extract.limit = Some(parse_env("BQEXTRACT_EXTRACT_LIMIT", &val)?);
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_STORAGE_URI_PREFIX") {
        extract.storage_uri_prefix = Some(val);
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_MAX_BATCH_SIZE") {
        extract.max_batch_size = Some(parse_env("BQEXTRACT_EXTRACT_MAX_BATCH_SIZE", &val)?);
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_HASH_COLUMNS") {
        extract.hash_columns = Some(HashColumnsSpec::Csv(val));
    }
    if let Ok(val) = std::env::var("BQEXTRACT_EXTRACT_CONVERT_COLUMNS_TO_STRING") {
        extract.convert_columns_to_string =
            parse_env("BQEXTRACT_EXTRACT_CONVERT_COLUMNS_TO_STRING", &val)?;
    }

    let warehouse = &mut config.warehouse;
    if let Ok(val) = std::env::var("BQEXTRACT_WAREHOUSE_ENDPOINT") {
        warehouse.endpoint = val;
    }
    if let Ok(val) = std::env::var("BQEXTRACT_WAREHOUSE_ACCESS_TOKEN") {
        warehouse.access_token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("BQEXTRACT_WAREHOUSE_LOCATION") {
        warehouse.location = Some(val);
    }
    if let Ok(val) = std::env::var("BQEXTRACT_WAREHOUSE_TIMEOUT_SECONDS") {
        warehouse.timeout_seconds = parse_env("BQEXTRACT_WAREHOUSE_TIMEOUT_SECONDS", &val)?;
    }

    let logging = &mut config.logging;
    if let Ok(val) = std::env::var("BQEXTRACT_LOGGING_LOCAL_ENABLED") {
        logging.local_enabled = parse_env("BQEXTRACT_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("BQEXTRACT_LOGGING_LOCAL_PATH") {
        logging.local_path = val;
    }

    Ok(())
}
