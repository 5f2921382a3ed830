//! # csv2batch - CSV to XML command batch conversion
//!
//! csv2batch turns a CSV file into an XML `CommandBatch` document: one
//! `Command` per kept row, one `Parameter` per mapped non-empty cell.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  XML Batch  │
//! │  (headers)  │     │ (delimiter) │     │ (map+filter)│     │ (namespace) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csv2batch::{convert_file, ConvertConfig, RowFilter};
//! use std::path::Path;
//!
//! let config = ConvertConfig::default()
//!     .with_default_command_name("Create")
//!     .with_prefix("Qty", "N-")
//!     .with_filter(RowFilter::from_fn(|row| row.get("Status") != Some("Archived")));
//!
//! convert_file(Path::new("items.csv"), Path::new("items.xml"), &config).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Diagnostic log stream
//! - [`models`] - Rows, commands and batches
//! - [`parser`] - CSV loading with delimiter detection
//! - [`mapping`] - Column to parameter resolution
//! - [`transform`] - Filtering, batch building and pipeline
//! - [`writer`] - XML serialization
//! - [`config`] - Conversion options and config files

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Configuration
pub mod config;

// Parsing
pub mod parser;

// Mapping and transformation
pub mod mapping;
pub mod transform;

// Output
pub mod writer;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, FilterError, PipelineError, PipelineResult, WriteError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Command, CommandBatch, Parameter, Row};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{parse_assignment, ConfigFile, ConvertConfig, DEFAULT_COMMAND_NAME_COLUMN};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{detect_delimiter, parse_csv, parse_csv_file, parse_str, Delimiter, LoadResult};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{
    resolve, resolve_target, split_targets, ColumnMapping, IgnoreReason, IgnoredColumn, MappingSource,
    MappingTable, Resolution,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    build_batch, build_command, convert_file, convert_file_to, convert_rows, preview_file, Condition, Conversion, ConversionSummary,
    ConvertOutcome, FilterOutcome, FilterRule, PreviewReport, RowFilter,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use writer::{to_xml_string, write_batch, write_batch_to, COMMANDS_NAMESPACE};
