//! Column to parameter mapping.
//!
//! Every header column resolves to zero, one or several parameter names.
//! Resolution happens once per column before any row is processed and
//! is applied uniformly to every row.
//!
//! # Precedence
//!
//! 1. ignored-columns list (column dropped)
//! 2. explicit `column -> target` map from configuration
//! 3. inline bracket annotation in the header: `Title [Name]`, `Ref [A|B]`, `Notes []`
//! 4. identity: the trimmed column name
//!
//! Configuration keys match either the full trimmed header (`Title [Name]`)
//! or the header without its annotation (`Title`).
//!
//! # Example
//!
//! ```rust,ignore
//! use csv2batch::{ConvertConfig, MappingTable};
//!
//! let headers = vec!["CommandName".to_string(), "Title [Name]".to_string(), "Qty".to_string()];
//! let table = MappingTable::from_headers(&headers, &ConvertConfig::default());
//! assert_eq!(table.entries()[0].targets, vec!["Name"]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::ConvertConfig;
use crate::transform::extractor::prefix_for;

/// Separator between several target names in one mapping.
pub const TARGET_SEPARATOR: char = '|';

/// First `[...]` group in a header. Text before it is the bare column name.
static INLINE_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>[^\[\]]*)\[(?P<targets>[^\[\]]*)\]").expect("valid regex"));

// =============================================================================
// Column names
// =============================================================================

/// A header cell split into its lookup keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName<'a> {
    /// Header text as read from the file.
    pub raw: &'a str,
    /// Header text without surrounding whitespace.
    pub trimmed: &'a str,
    /// Header text before the bracket annotation, trimmed. Equals `trimmed`
    /// when there is no annotation.
    pub base: &'a str,
    /// Content of the bracket annotation, untrimmed.
    pub inline: Option<&'a str>,
}

impl<'a> ColumnName<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        match INLINE_ANNOTATION.captures(trimmed) {
            Some(caps) => {
                let base = caps.name("base").map(|m| m.as_str().trim()).unwrap_or("");
                let inline = caps.name("targets").map(|m| m.as_str());
                Self { raw, trimmed, base, inline }
            }
            None => Self {
                raw,
                trimmed,
                base: trimmed,
                inline: None,
            },
        }
    }

    /// Look the column up in a config map: full trimmed name first, then bare name.
    pub fn lookup<'m, V>(&self, map: &'m HashMap<String, V>) -> Option<&'m V> {
        map.get(self.trimmed).or_else(|| map.get(self.base))
    }

    /// Whether the column is listed in a config set.
    pub fn listed_in(&self, set: &HashSet<String>) -> bool {
        set.contains(self.trimmed) || set.contains(self.base)
    }

    /// Whether this is the column carrying the command name.
    pub fn is_command_name(&self, command_name_column: &str) -> bool {
        let wanted = command_name_column.trim();
        !wanted.is_empty() && (self.trimmed == wanted || self.base == wanted)
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Where a column's target names came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingSource {
    Explicit,
    Inline,
    Identity,
}

impl fmt::Display for MappingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingSource::Explicit => "explicit",
            MappingSource::Inline => "inline",
            MappingSource::Identity => "identity",
        };
        f.write_str(s)
    }
}

/// Why a column produces no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Named in the ignored-columns list.
    Listed,
    /// Explicit map targets nothing.
    ExplicitEmpty,
    /// Inline annotation is empty (`Notes []`).
    InlineEmpty,
    /// Header cell is blank.
    BlankName,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IgnoreReason::Listed => "ignored-columns list",
            IgnoreReason::ExplicitEmpty => "mapped to nothing",
            IgnoreReason::InlineEmpty => "empty [] annotation",
            IgnoreReason::BlankName => "blank header",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ignored(IgnoreReason),
    Mapped { target: String, source: MappingSource },
}

/// Resolve a column with full provenance.
pub fn resolve(column: &str, config: &ConvertConfig) -> Resolution {
    let name = ColumnName::parse(column);

    if name.listed_in(&config.ignored_columns) {
        return Resolution::Ignored(IgnoreReason::Listed);
    }

    if let Some(target) = name.lookup(&config.column_to_parameter) {
        return if split_targets(target).is_empty() {
            Resolution::Ignored(IgnoreReason::ExplicitEmpty)
        } else {
            Resolution::Mapped {
                target: target.clone(),
                source: MappingSource::Explicit,
            }
        };
    }

    if let Some(inline) = name.inline {
        return if split_targets(inline).is_empty() {
            Resolution::Ignored(IgnoreReason::InlineEmpty)
        } else {
            Resolution::Mapped {
                target: inline.to_string(),
                source: MappingSource::Inline,
            }
        };
    }

    if name.trimmed.is_empty() {
        return Resolution::Ignored(IgnoreReason::BlankName);
    }

    Resolution::Mapped {
        target: name.trimmed.to_string(),
        source: MappingSource::Identity,
    }
}

/// Resolve a column to its target specification.
///
/// Returns `""` when the column is ignored, otherwise one or more
/// parameter names joined by `|`. Never fails.
pub fn resolve_target(column: &str, config: &ConvertConfig) -> String {
    match resolve(column, config) {
        Resolution::Ignored(_) => String::new(),
        Resolution::Mapped { target, .. } => target,
    }
}

/// Split a target specification into parameter names.
///
/// Names are trimmed and empty segments dropped, so `"A| B |"` gives `["A", "B"]`.
pub fn split_targets(target: &str) -> Vec<String> {
    target
        .split(TARGET_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Mapping table
// =============================================================================

/// A mapped column: its header position, names and prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    /// Position in the header.
    pub index: usize,
    /// Header text as read.
    pub column: String,
    /// Parameter names, in declaration order.
    pub targets: Vec<String>,
    pub source: MappingSource,
    /// Value prefix registered for the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// A column that never produces parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredColumn {
    pub index: usize,
    pub column: String,
    pub reason: IgnoreReason,
}

/// Column resolution for a whole header, computed once per load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingTable {
    entries: Vec<ColumnMapping>,
    ignored: Vec<IgnoredColumn>,
    command_name_index: Option<usize>,
}

impl MappingTable {
    /// Resolve every header column against `config`.
    ///
    /// The first column named like `config.command_name_column` carries the
    /// command name and is left out of both lists.
    pub fn from_headers(headers: &[String], config: &ConvertConfig) -> Self {
        let mut table = MappingTable::default();

        for (index, column) in headers.iter().enumerate() {
            let name = ColumnName::parse(column);

            if table.command_name_index.is_none() && name.is_command_name(&config.command_name_column) {
                table.command_name_index = Some(index);
                continue;
            }

            match resolve(column, config) {
                Resolution::Ignored(reason) => table.ignored.push(IgnoredColumn {
                    index,
                    column: column.clone(),
                    reason,
                }),
                Resolution::Mapped { target, source } => table.entries.push(ColumnMapping {
                    index,
                    column: column.clone(),
                    targets: split_targets(&target),
                    source,
                    prefix: prefix_for(&name, &config.column_value_prefix).map(str::to_string),
                }),
            }
        }

        table
    }

    /// Mapped columns in header order.
    pub fn entries(&self) -> &[ColumnMapping] {
        &self.entries
    }

    /// Ignored columns in header order.
    pub fn ignored(&self) -> &[IgnoredColumn] {
        &self.ignored
    }

    /// Header position of the command name column.
    pub fn command_name_index(&self) -> Option<usize> {
        self.command_name_index
    }

    /// Mapping for a header column, by its text (exact, then trimmed).
    pub fn get(&self, column: &str) -> Option<&ColumnMapping> {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .or_else(|| self.entries.iter().find(|e| e.column.trim() == column.trim()))
    }

    /// Human-readable lines describing the table, one per column.
    pub fn describe(&self) -> Vec<String> {
        let mut lines: Vec<(usize, String)> = Vec::new();

        if let Some(index) = self.command_name_index {
            lines.push((index, format!("[{:2}] (command name)", index + 1)));
        }
        for entry in &self.entries {
            let prefix = entry
                .prefix
                .as_ref()
                .map(|p| format!(" (prefix \"{}\")", p))
                .unwrap_or_default();
            lines.push((
                entry.index,
                format!(
                    "[{:2}] {} → {} ({}){}",
                    entry.index + 1,
                    entry.column.trim(),
                    entry.targets.join(" + "),
                    entry.source,
                    prefix
                ),
            ));
        }
        for ignored in &self.ignored {
            lines.push((
                ignored.index,
                format!("[{:2}] {} ✗ ignored ({})", ignored.index + 1, ignored.column.trim(), ignored.reason),
            ));
        }

        lines.sort_by_key(|(i, _)| *i);
        lines.into_iter().map(|(_, l)| l).collect()
    }
}
