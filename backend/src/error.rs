//! Error types for the trendrank pipelines.
//!
//! - [`LoadError`] - Loader failures (I/O, unknown labels, no encoding worked)
//! - [`SchemaError`] - Required columns absent from a loaded table
//! - [`PipelineError`] - Fatal, top-level orchestration errors
//! - [`Incomplete`] - Recoverable conditions attached to a report
//! - [`ConfigError`] - Environment and side-file configuration errors
//!
//! `LoadError` and `SchemaError` convert into `PipelineError` so `?` works
//! across the layers. `Incomplete` never aborts a pipeline; it is carried in
//! the report's status instead.

use serde::Serialize;
use thiserror::Error;

use crate::parser::Attempt;

// =============================================================================
// Loader Errors
// =============================================================================

/// Errors while turning a source into a raw table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to open or read the source.
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),

    /// An encoding label that `encoding_rs` does not know.
    #[error("Unknown encoding label: {0}")]
    UnknownEncoding(String),

    /// No candidate encoding produced a parsable table.
    #[error("Unreadable source '{name}': {}", describe_attempts(.attempts))]
    UnreadableSource { name: String, attempts: Vec<Attempt> },
}

fn describe_attempts(attempts: &[Attempt]) -> String {
    if attempts.is_empty() {
        return "no encoding candidates given".to_string();
    }
    attempts
        .iter()
        .map(|a| match &a.error {
            Some(err) => format!("{} ({})", a.encoding, err),
            None => format!("{} (ok)", a.encoding),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors from the schema check at normalizer entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A designated column is not in the header row.
    #[error("Missing required column '{column}' (available: {})", .available.join(", "))]
    MissingRequiredColumn { column: String, available: Vec<String> },
}

// =============================================================================
// Recoverable conditions
// =============================================================================

/// What a data count refers to in [`Incomplete::InsufficientData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataUnit {
    Periods,
    Countries,
}

impl std::fmt::Display for DataUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataUnit::Periods => write!(f, "periods"),
            DataUnit::Countries => write!(f, "countries"),
        }
    }
}

/// Recoverable conditions. A pipeline that hits one still returns its data,
/// tagged incomplete, so the presenter can degrade gracefully.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Incomplete {
    /// Too few distinct periods to fit a trend, or no countries to rank.
    #[error("Insufficient data: found {found} {unit}, need at least {required}")]
    InsufficientData {
        found: usize,
        required: usize,
        unit: DataUnit,
    },

    /// Lookup of a country name (or any of its aliases) missed.
    #[error("Country not found: {name}")]
    CountryNotFound { name: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Fatal pipeline errors. No partial output accompanies these.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source could not be loaded.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// The loaded schema lacks a designated column.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading configuration from the environment or side files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// A side file could not be read.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A side file was not valid JSON.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;
