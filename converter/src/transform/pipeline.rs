//! High-level pipeline API: load → map → filter → build → write.
//!
//! # Example
//!
//! ```rust,ignore
//! use csv2batch::{convert_file, ConvertConfig, ConvertOutcome};
//! use std::path::Path;
//!
//! let config = ConvertConfig::default().with_default_command_name("Create");
//! match convert_file(Path::new("items.csv"), Path::new("items.xml"), &config)? {
//!     ConvertOutcome::Written { path, summary } => {
//!         println!("{} commands written to {}", summary.commands, path.display());
//!     }
//!     ConvertOutcome::Preview(report) => println!("{:#?}", report.mapping),
//! }
//! ```

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::ConvertConfig;
use crate::error::PipelineResult;
use crate::logs::{log_info, log_info_indent, log_success, log_warning, LogEntry, LOG_BROADCASTER};
use crate::mapping::{ColumnName, MappingTable};
use crate::models::{CommandBatch, Row};
use crate::parser::parse_csv_file;
use crate::transform::builder::build_batch;
use crate::writer::{write_batch, write_batch_to};

/// Counts reported after a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSummary {
    /// Rows loaded from the CSV.
    pub rows_read: usize,
    /// Rows rejected by the filter.
    pub rows_excluded: usize,
    /// Commands in the batch (= rows kept).
    pub commands: usize,
    /// Parameters across all commands.
    pub parameters: usize,
}

/// Result of an in-memory conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub mapping: MappingTable,
    pub batch: CommandBatch,
    pub summary: ConversionSummary,
}

/// What preview mode reports instead of writing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub headers: Vec<String>,
    pub mapping: MappingTable,
    pub rows_read: usize,
    pub rows_excluded: usize,
}

/// Result of [`convert_file`].
#[derive(Debug, Clone)]
pub enum ConvertOutcome {
    /// The batch was written to `path` (absolute).
    Written { path: PathBuf, summary: ConversionSummary },
    /// Preview mode: mapping resolved and reported, nothing written.
    Preview(PreviewReport),
}

/// Map, filter and build a batch from already loaded rows.
///
/// The mapping is resolved once from `headers`; the filter runs over all
/// rows before the first command is built.
pub fn convert_rows(headers: &[String], rows: Vec<Row>, config: &ConvertConfig) -> PipelineResult<Conversion> {
    let mapping = MappingTable::from_headers(headers, config);
    let filtered = config.filter.apply(rows)?;
    let batch = build_batch(&filtered.rows, &mapping, &config.default_command_name);

    let summary = ConversionSummary {
        rows_read: filtered.total,
        rows_excluded: filtered.excluded(),
        commands: batch.len(),
        parameters: batch.parameter_count(),
    };

    Ok(Conversion {
        mapping,
        batch,
        summary,
    })
}

/// Rows and mapping after load, mapping and filtering.
struct Prepared {
    headers: Vec<String>,
    mapping: MappingTable,
    rows: Vec<Row>,
    rows_read: usize,
}

impl Prepared {
    fn rows_excluded(&self) -> usize {
        self.rows_read - self.rows.len()
    }

    fn into_report(self) -> PreviewReport {
        PreviewReport {
            rows_excluded: self.rows_excluded(),
            headers: self.headers,
            mapping: self.mapping,
            rows_read: self.rows_read,
        }
    }
}

/// Load, map and filter, logging each step.
fn prepare(input: &Path, config: &ConvertConfig) -> PipelineResult<Prepared> {
    // Step 1: Load
    log_info(format!("📖 Reading CSV file: {}", input.display()));
    let loaded = parse_csv_file(input, config.delimiter)?;
    log_success(format!("Read {} rows", loaded.rows.len()));
    log_success(format!("Separator: '{}'", format_delimiter(loaded.delimiter)));

    log_info(format!("📋 CSV has {} columns:", loaded.headers.len()));
    for (i, col) in loaded.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    // Step 2: Mapping
    let mapping = MappingTable::from_headers(&loaded.headers, config);
    for entry in mapping_diagnostics(&mapping, &loaded.headers, config) {
        LOG_BROADCASTER.log(entry);
    }

    // Step 3: Filter
    log_info(format!("🔎 Filtering rows ({})...", config.filter.describe()));
    let rows_read = loaded.rows.len();
    let filtered = config.filter.apply(loaded.rows)?;
    if filtered.excluded() > 0 {
        log_warning(format!(
            "{} of {} rows excluded by filter, {} kept",
            filtered.excluded(),
            rows_read,
            filtered.rows.len()
        ));
    } else {
        log_success(format!("All {} rows kept", rows_read));
    }

    Ok(Prepared {
        headers: loaded.headers,
        mapping,
        rows: filtered.rows,
        rows_read,
    })
}

/// Build the batch from prepared rows.
fn build(prepared: &Prepared, config: &ConvertConfig) -> (CommandBatch, ConversionSummary) {
    // Step 4: Build
    log_info("⚙️  Building command batch...");
    let batch = build_batch(&prepared.rows, &prepared.mapping, &config.default_command_name);
    let summary = ConversionSummary {
        rows_read: prepared.rows_read,
        rows_excluded: prepared.rows_excluded(),
        commands: batch.len(),
        parameters: batch.parameter_count(),
    };
    log_success(format!(
        "Built {} commands with {} parameters",
        summary.commands, summary.parameters
    ));
    (batch, summary)
}

/// Resolve and report the mapping for `input` without building or writing.
pub fn preview_file(input: &Path, config: &ConvertConfig) -> PipelineResult<PreviewReport> {
    let prepared = prepare(input, config)?;
    log_info("👀 Preview mode: nothing written");
    Ok(prepared.into_report())
}

/// Convert a CSV file into an XML command batch at `output`.
///
/// With `config.preview` set, the mapping is reported and nothing is written.
/// The whole batch is built in memory before the output file is touched.
pub fn convert_file(input: &Path, output: &Path, config: &ConvertConfig) -> PipelineResult<ConvertOutcome> {
    if config.preview {
        return preview_file(input, config).map(ConvertOutcome::Preview);
    }

    let prepared = prepare(input, config)?;
    let (batch, summary) = build(&prepared, config);

    // Step 5: Write
    let path = write_batch(&batch, output)?;
    log_success(format!("💾 Written to: {}", path.display()));

    Ok(ConvertOutcome::Written { path, summary })
}

/// Convert a CSV file and stream the XML document into `sink` (e.g. stdout).
///
/// Preview mode is not handled here; use [`preview_file`].
pub fn convert_file_to<W: Write>(input: &Path, sink: W, config: &ConvertConfig) -> PipelineResult<ConversionSummary> {
    let prepared = prepare(input, config)?;
    let (batch, summary) = build(&prepared, config);
    write_batch_to(&batch, sink)?;
    Ok(summary)
}

/// Diagnostics for a resolved mapping: one line per column, the command
/// name source, ignored columns and configured columns missing from the header.
fn mapping_diagnostics(mapping: &MappingTable, headers: &[String], config: &ConvertConfig) -> Vec<LogEntry> {
    let mut entries = vec![LogEntry::info("🗺️  Column mapping:")];
    entries.extend(mapping.describe().into_iter().map(|line| LogEntry::info(line).with_indent(1)));

    entries.push(match mapping.command_name_index() {
        Some(_) => LogEntry::success(format!(
            "Command name from column '{}' (default: \"{}\")",
            config.command_name_column, config.default_command_name
        )),
        None => LogEntry::warning(format!(
            "No '{}' column, every command is named \"{}\"",
            config.command_name_column, config.default_command_name
        )),
    });

    if mapping.ignored().is_empty() {
        entries.push(LogEntry::info("No ignored columns"));
    } else {
        let names: Vec<&str> = mapping.ignored().iter().map(|c| c.column.trim()).collect();
        entries.push(LogEntry::info(format!("Ignored columns ({}): {}", names.len(), names.join(", "))));
    }

    for key in unknown_keys(headers, config) {
        entries.push(LogEntry::warning(format!("Configured column '{}' is not in the CSV header", key)));
    }

    entries
}

/// Configuration keys that match no header column, sorted.
fn unknown_keys<'c>(headers: &[String], config: &'c ConvertConfig) -> Vec<&'c str> {
    let names: Vec<ColumnName<'_>> = headers.iter().map(|h| ColumnName::parse(h)).collect();
    let known = |key: &str| names.iter().any(|n| n.trimmed == key || n.base == key);

    let mut unknown: Vec<&str> = config
        .column_to_parameter
        .keys()
        .chain(config.column_value_prefix.keys())
        .chain(config.ignored_columns.iter())
        .map(String::as_str)
        .filter(|key| !known(key))
        .collect();
    unknown.sort_unstable();
    unknown.dedup();
    unknown
}

/// Format delimiter for display
fn format_delimiter(d: u8) -> &'static str {
    match d {
        b';' => ";",
        b',' => ",",
        b'\t' => "TAB",
        b'|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Parameter;
    use crate::parser::{parse_str, Delimiter};
    use crate::transform::filter::RowFilter;

    const SAMPLE: &str = "CommandName,Title [Name],Qty\nCreate,Widget,5\n";

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_convert_rows_counts() {
        let loaded = parse_str("CommandName,Qty,Status\nA,1,on\nB,2,off\nC,,on\n", Delimiter::default()).unwrap();
        let config = ConvertConfig::default()
            .with_ignored("Status")
            .with_filter(RowFilter::from_fn(|row| row.get("Status") == Some("on")));

        let conversion = convert_rows(&loaded.headers, loaded.rows, &config).unwrap();

        assert_eq!(conversion.summary.rows_read, 3);
        assert_eq!(conversion.summary.rows_excluded, 1);
        assert_eq!(conversion.summary.commands, 2);
        assert_eq!(conversion.summary.parameters, 1);
        assert_eq!(conversion.batch.commands[1].name, "C");
    }

    #[test]
    fn test_convert_file_round_trip() {
        let input = csv_file(SAMPLE);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("batch.xml");

        let outcome = convert_file(input.path(), &output, &ConvertConfig::default()).unwrap();
        let ConvertOutcome::Written { path, summary } = outcome else {
            panic!("expected a written batch");
        };

        assert_eq!(path, output);
        assert_eq!(summary.commands, 1);
        assert_eq!(summary.parameters, 2);

        let xml = std::fs::read_to_string(&output).unwrap();
        assert!(xml.contains("http://schemas.remotex.net/Apps/201207/Commands"));
        assert!(xml.contains("<Name>Create</Name>"));
        assert!(xml.contains("<Value>Widget</Value>"));
        assert!(xml.contains("<Value>5</Value>"));
    }

    #[test]
    fn test_convert_file_with_prefix() {
        let input = csv_file(SAMPLE);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("batch.xml");
        let config = ConvertConfig::default().with_prefix("Qty", "N-");

        convert_file(input.path(), &output, &config).unwrap();
        let xml = std::fs::read_to_string(&output).unwrap();
        assert!(xml.contains("<Value>N-5</Value>"));
    }

    #[test]
    fn test_preview_writes_nothing_and_reports_mapping() {
        let input = csv_file("CommandName,Title [Name],Notes [],Internal,Qty\nCreate,Widget,x,y,5\n");
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("batch.xml");
        let config = ConvertConfig::default().with_ignored("Internal").with_preview(true);

        let outcome = convert_file(input.path(), &output, &config).unwrap();

        assert!(!output.exists());
        let ConvertOutcome::Preview(report) = outcome else {
            panic!("expected a preview");
        };
        assert_eq!(report.rows_read, 1);
        assert_eq!(report.mapping.entries().len(), 2);
        assert_eq!(report.mapping.get("Title [Name]").unwrap().targets, vec!["Name"]);
        let ignored: Vec<&str> = report.mapping.ignored().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(ignored, vec!["Notes []", "Internal"]);

        let messages: Vec<String> = mapping_diagnostics(&report.mapping, &report.headers, &config)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.iter().any(|m| m.contains("Title [Name] → Name")));
        assert!(messages.iter().any(|m| m.contains("Ignored columns (2): Notes [], Internal")));
    }

    #[test]
    fn test_diagnostics_flag_unknown_config_columns() {
        let headers = vec!["CommandName".to_string(), "Qty [Amount]".to_string()];
        let config = ConvertConfig::default()
            .with_prefix("Qty", "N-")
            .with_mapping("Missing", "X")
            .with_ignored("Gone");
        let mapping = MappingTable::from_headers(&headers, &config);

        assert_eq!(unknown_keys(&headers, &config), vec!["Gone", "Missing"]);

        let warnings: Vec<String> = mapping_diagnostics(&mapping, &headers, &config)
            .into_iter()
            .filter(|e| e.level == crate::logs::LogLevel::Warning)
            .map(|e| e.message)
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'Gone'"));
    }

    #[test]
    fn test_diagnostics_without_command_column() {
        let headers = vec!["Qty".to_string()];
        let config = ConvertConfig::default().with_default_command_name("Create");
        let mapping = MappingTable::from_headers(&headers, &config);

        let entries = mapping_diagnostics(&mapping, &headers, &config);
        assert!(entries
            .iter()
            .any(|e| e.level == crate::logs::LogLevel::Warning && e.message.contains("\"Create\"")));
        assert!(entries.iter().any(|e| e.message == "No ignored columns"));
    }

    #[test]
    fn test_preview_file_counts_filtered_rows() {
        let input = csv_file("CommandName,Status\nA,on\nB,off\n");
        let config = ConvertConfig::default().with_filter(RowFilter::from_fn(|row| row.get("Status") == Some("on")));

        let report = preview_file(input.path(), &config).unwrap();
        assert_eq!(report.headers, vec!["CommandName", "Status"]);
        assert_eq!(report.rows_read, 2);
        assert_eq!(report.rows_excluded, 1);
    }

    #[test]
    fn test_convert_file_to_writer() {
        let input = csv_file(SAMPLE);
        let mut buffer = Vec::new();

        let summary = convert_file_to(input.path(), &mut buffer, &ConvertConfig::default()).unwrap();
        let xml = String::from_utf8(buffer).unwrap();

        assert_eq!(summary.commands, 1);
        assert!(xml.contains("<Value>Widget</Value>"));
        assert!(xml.trim_end().ends_with("</CommandBatch>"));
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert_file(&dir.path().join("nope.csv"), &dir.path().join("out.xml"), &ConvertConfig::default())
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Csv(_)));
    }

    #[test]
    fn test_filter_error_writes_nothing() {
        let input = csv_file(SAMPLE);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("batch.xml");
        let config = ConvertConfig::default().with_filter(RowFilter::try_from_fn(|_| Err::<bool, _>("boom")));

        let err = convert_file(input.path(), &output, &config).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Filter(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let input = csv_file(SAMPLE);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("no-such-dir").join("batch.xml");

        let err = convert_file(input.path(), &output, &ConvertConfig::default()).unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Write(_)));
    }

    #[test]
    fn test_commands_match_kept_rows() {
        let loaded = parse_str("CommandName,Qty\nA,1\nB,2\nC,3\nD,4\n", Delimiter::default()).unwrap();
        let config = ConvertConfig::default()
            .with_filter(RowFilter::from_fn(|row| row.get("Qty").is_some_and(|q| q != "2")));

        let conversion = convert_rows(&loaded.headers, loaded.rows, &config).unwrap();
        let names: Vec<&str> = conversion.batch.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "D"]);
        assert_eq!(conversion.batch.commands[2].parameters, vec![Parameter::new("Qty", "4")]);
    }
}
