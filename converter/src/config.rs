//! Conversion configuration.
//!
//! [`ConvertConfig`] is what the pipeline consumes. Every field is optional
//! and defaults to "no override". [`ConfigFile`] is its JSON form, used by
//! the CLI `--config` option; the row filter is expressed there as a list
//! of [`FilterRule`]s.
//!
//! ```json
//! {
//!   "defaultCommandName": "Create",
//!   "columnToParameter": { "Title": "Name", "Ref": "Reference|ExternalId" },
//!   "ignoredColumns": ["Internal notes"],
//!   "columnValuePrefix": { "Qty": "N-" },
//!   "filters": [{ "column": "Status", "equals": "Active" }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::parser::Delimiter;
use crate::transform::filter::{Condition, FilterRule, RowFilter};

/// Column holding the command name unless configured otherwise.
pub const DEFAULT_COMMAND_NAME_COLUMN: &str = "CommandName";

/// Options for one conversion run.
#[derive(Debug)]
pub struct ConvertConfig {
    /// Command name used when a row has no (or a blank) command name cell.
    pub default_command_name: String,

    /// Rows failing this predicate produce no command.
    pub filter: RowFilter,

    /// Explicit `column -> target` overrides; targets may be `|`-joined,
    /// an empty target ignores the column.
    pub column_to_parameter: HashMap<String, String>,

    /// Columns that never produce parameters.
    pub ignored_columns: HashSet<String>,

    /// `column -> prefix` prepended to every non-empty value.
    pub column_value_prefix: HashMap<String, String>,

    /// Report the mapping and stop before writing.
    pub preview: bool,

    /// Header of the column carrying the command name.
    pub command_name_column: String,

    /// CSV field separator.
    pub delimiter: Delimiter,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            default_command_name: String::new(),
            filter: RowFilter::accept_all(),
            column_to_parameter: HashMap::new(),
            ignored_columns: HashSet::new(),
            column_value_prefix: HashMap::new(),
            preview: false,
            command_name_column: DEFAULT_COMMAND_NAME_COLUMN.to_string(),
            delimiter: Delimiter::default(),
        }
    }
}

impl ConvertConfig {
    pub fn with_default_command_name(mut self, name: impl Into<String>) -> Self {
        self.default_command_name = name.into();
        self
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Map a column to one or more `|`-joined targets (empty = ignore).
    pub fn with_mapping(mut self, column: impl AsRef<str>, target: impl Into<String>) -> Self {
        self.column_to_parameter
            .insert(column.as_ref().trim().to_string(), target.into());
        self
    }

    pub fn with_ignored(mut self, column: impl AsRef<str>) -> Self {
        self.ignored_columns.insert(column.as_ref().trim().to_string());
        self
    }

    pub fn with_prefix(mut self, column: impl AsRef<str>, prefix: impl Into<String>) -> Self {
        self.column_value_prefix
            .insert(column.as_ref().trim().to_string(), prefix.into());
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_command_name_column(mut self, column: impl AsRef<str>) -> Self {
        self.command_name_column = column.as_ref().trim().to_string();
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }
}

// =============================================================================
// Config file
// =============================================================================

/// JSON configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_command_name: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub column_to_parameter: HashMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_columns: Vec<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub column_value_prefix: HashMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterRule>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub preview: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_name_column: Option<String>,

    /// Single character, `"\t"`, or `"auto"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl ConfigFile {
    /// Read a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compile into a [`ConvertConfig`]. Keys are trimmed; filter regexes are
    /// compiled here so a bad pattern fails before any file is read.
    pub fn into_config(self) -> ConfigResult<ConvertConfig> {
        let delimiter = match self.delimiter.as_deref() {
            Some(d) => d.parse().map_err(|message| ConfigError::InvalidArgument {
                option: "delimiter".to_string(),
                value: d.to_string(),
                message,
            })?,
            None => Delimiter::default(),
        };

        let filter = RowFilter::from_rules(self.filters)?;

        let mut config = ConvertConfig::default()
            .with_default_command_name(self.default_command_name.unwrap_or_default())
            .with_filter(filter)
            .with_preview(self.preview)
            .with_delimiter(delimiter);

        if let Some(column) = self.command_name_column {
            config = config.with_command_name_column(column);
        }
        for (column, target) in self.column_to_parameter {
            config = config.with_mapping(column, target);
        }
        for column in self.ignored_columns {
            config = config.with_ignored(column);
        }
        for (column, prefix) in self.column_value_prefix {
            config = config.with_prefix(column, prefix);
        }

        Ok(config)
    }

    /// Sample configuration printed by `csv2batch example-config`.
    pub fn example() -> Self {
        let mut column_to_parameter = HashMap::new();
        column_to_parameter.insert("Title".to_string(), "Name".to_string());
        column_to_parameter.insert("Ref".to_string(), "Reference|ExternalId".to_string());
        column_to_parameter.insert("Legacy id".to_string(), String::new());

        let mut column_value_prefix = HashMap::new();
        column_value_prefix.insert("Qty".to_string(), "N-".to_string());

        Self {
            default_command_name: Some("Create".to_string()),
            column_to_parameter,
            ignored_columns: vec!["Internal notes".to_string()],
            column_value_prefix,
            filters: vec![
                FilterRule::new("Status", Condition::NotEquals("Archived".to_string())),
                FilterRule::new("Title", Condition::NotEmpty(true)),
            ],
            preview: false,
            command_name_column: None,
            delimiter: None,
        }
    }
}

/// Split a `KEY=VALUE` command line value. Only the first `=` separates.
pub fn parse_assignment(option: &str, value: &str) -> ConfigResult<(String, String)> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.trim().to_string(), val.to_string())),
        _ => Err(ConfigError::InvalidArgument {
            option: option.to_string(),
            value: value.to_string(),
            message: "expected COLUMN=VALUE".to_string(),
        }),
    }
}
