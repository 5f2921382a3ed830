//! Domain models for the csv2batch pipeline.
//!
//! - [`Row`] - One loaded CSV record, column order preserved
//! - [`Parameter`] - Named value attached to a command
//! - [`Command`] - One output unit, built from one row
//! - [`CommandBatch`] - Ordered list of commands written as one XML document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

// =============================================================================
// Row
// =============================================================================

/// A single CSV record.
///
/// Rows loaded from the same file share one header slice. A record shorter
/// than the header has *absent* trailing cells, which behave like blank ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    pub fn new(headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self { headers, values }
    }

    /// Build a row from `(column, value)` pairs. Mostly useful in tests
    /// and when rows come from somewhere other than a CSV file.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (headers, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(headers.into(), values)
    }

    /// Column names in discovery order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Raw value at a header position, `None` when the cell is absent.
    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Raw value by column name.
    ///
    /// An exact header match wins; otherwise headers are compared trimmed.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self
            .headers
            .iter()
            .position(|h| h == column)
            .or_else(|| {
                let wanted = column.trim();
                self.headers.iter().position(|h| h.trim() == wanted)
            })?;
        self.value_at(index)
    }

    /// Whether the header contains `column` (exact or trimmed match).
    pub fn has_column(&self, column: &str) -> bool {
        let wanted = column.trim();
        self.headers.iter().any(|h| h == column || h.trim() == wanted)
    }

    /// Iterate `(column, raw value)` over present cells, in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// Render as a JSON object, absent cells as empty strings.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (i, header) in self.headers.iter().enumerate() {
            let value = self.value_at(i).unwrap_or("");
            obj.insert(header.clone(), Value::String(value.to_string()));
        }
        Value::Object(obj)
    }
}

// =============================================================================
// Parameter / Command / Batch
// =============================================================================

/// A named value attached to a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One output unit of the batch, corresponding to one input row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Command {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn push_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// First parameter with the given name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Every parameter with the given name. Duplicate names are allowed.
    pub fn parameters_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Parameter> {
        self.parameters.iter().filter(move |p| p.name == name)
    }
}

/// Root container: an ordered sequence of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandBatch {
    pub commands: Vec<Command>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Total number of parameters across all commands.
    pub fn parameter_count(&self) -> usize {
        self.commands.iter().map(|c| c.parameters.len()).sum()
    }
}

impl<'a> IntoIterator for &'a CommandBatch {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_by_name() {
        let row = Row::from_pairs([("CommandName", "Create"), (" Qty ", "5")]);

        assert_eq!(row.get("CommandName"), Some("Create"));
        assert_eq!(row.get("Qty"), Some("5"));
        assert_eq!(row.get("Missing"), None);
        assert!(row.has_column("Qty"));
    }

    #[test]
    fn test_row_absent_cells() {
        let headers: Arc<[String]> = vec!["a".to_string(), "b".to_string()].into();
        let row = Row::new(headers, vec!["1".to_string()]);

        assert_eq!(row.value_at(0), Some("1"));
        assert_eq!(row.value_at(1), None);
        assert_eq!(row.iter().count(), 1);
        assert_eq!(row.to_json()["b"], "");
    }

    #[test]
    fn test_row_json_keeps_column_order() {
        let row = Row::from_pairs([("z", "1"), ("a", "2")]);
        let json = row.to_json();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_duplicate_parameter_names() {
        let mut cmd = Command::new("Update");
        cmd.push_parameter(Parameter::new("Ref", "1"));
        cmd.push_parameter(Parameter::new("Ref", "2"));

        assert_eq!(cmd.parameter("Ref").unwrap().value, "1");
        assert_eq!(cmd.parameters_named("Ref").count(), 2);
    }

    #[test]
    fn test_batch_counts() {
        let mut batch = CommandBatch::new();
        assert!(batch.is_empty());

        let mut cmd = Command::new("Create");
        cmd.push_parameter(Parameter::new("Name", "Widget"));
        batch.push(cmd);
        batch.push(Command::new(""));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.parameter_count(), 1);
    }
}
