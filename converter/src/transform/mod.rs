//! Transformation module.
//!
//! This module turns loaded rows into a command batch:
//! - Extractor: cell value extraction and prefixes
//! - Filter: row selection
//! - Builder: rows to commands
//! - Pipeline: load, map, filter, build and write

pub mod builder;
pub mod extractor;
pub mod filter;
pub mod pipeline;

pub use builder::{build_batch, build_command};
pub use filter::{Condition, FilterOutcome, FilterRule, RowFilter};
pub use pipeline::*;
