//! Error types for the csv2batch conversion pipeline.
//!
//! One error type per stage:
//!
//! - [`CsvError`] - CSV loading errors
//! - [`ConfigError`] - configuration file and argument errors
//! - [`FilterError`] - row filter compilation and evaluation errors
//! - [`WriteError`] - XML serialization and output errors
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Loading Errors
// =============================================================================

/// Errors while loading the CSV input.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to open or read the input file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV content.
    #[error("Invalid CSV format at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Input has no header row at all.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row is present but holds no column names.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl CsvError {
    /// Convert a `csv` crate error, keeping the line number when it has one.
    pub fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CsvError::Parse {
                line,
                message: e.to_string(),
            },
            csv::ErrorKind::Utf8 { err, .. } => CsvError::Parse {
                line,
                message: format!("invalid UTF-8 ({}), transcode the file first", err),
            },
            other => CsvError::Parse {
                line,
                message: format!("{:?}", other),
            },
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in conversion configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected shape.
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed command line value (e.g. `--map` without `=`).
    #[error("Invalid value '{value}' for {option}: {message}")]
    InvalidArgument {
        option: String,
        value: String,
        message: String,
    },

    /// Filter rules in the config do not compile.
    #[error("{0}")]
    Filter(#[from] FilterError),
}

// =============================================================================
// Filter Errors
// =============================================================================

/// Errors raised by row filters.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A filter rule names a column that is not in the header.
    #[error("Filter references unknown column '{0}'")]
    UnknownColumn(String),

    /// A `matches` rule holds an invalid regular expression.
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A caller-supplied predicate failed on a row.
    #[error("Filter failed on row {row}: {message}")]
    Predicate { row: usize, message: String },
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while serializing or writing the command batch.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Output file could not be written.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Current directory could not be determined to resolve a relative path.
    #[error("Cannot resolve output path '{path}': {source}")]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// XML event could not be written to the sink.
    #[error("XML serialization failed: {0}")]
    Buffer(#[from] std::io::Error),

    /// Serialized document is not valid UTF-8.
    #[error("XML serialization produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::convert_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV loading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Row filter error.
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Output error.
    #[error("Output error: {0}")]
    Write(#[from] WriteError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for output operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
