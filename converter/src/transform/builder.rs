//! Build the in-memory [`CommandBatch`] from filtered rows.
//!
//! One row always gives exactly one command, in row order, even when
//! none of its cells produce a parameter.

use crate::mapping::MappingTable;
use crate::models::{Command, CommandBatch, Parameter, Row};
use crate::transform::extractor::extract_value;

/// Command name for a row: its command name cell when non-blank, else `default`.
///
/// The cell is trimmed first, so a whitespace-only name falls back to the
/// default. Parameter values differ: only an empty cell is omitted there and a
/// whitespace-only value is kept as `""` (see [`extract_value`]). A command
/// always needs a usable name, while an empty parameter value is valid output.
pub fn command_name(row: &Row, table: &MappingTable, default: &str) -> String {
    table
        .command_name_index()
        .and_then(|i| row.value_at(i))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Build the command for a single row.
pub fn build_command(row: &Row, table: &MappingTable, default_command_name: &str) -> Command {
    let mut command = Command::new(command_name(row, table, default_command_name));

    for entry in table.entries() {
        let Some(value) = extract_value(entry.prefix.as_deref(), row.value_at(entry.index)) else {
            continue;
        };
        for target in &entry.targets {
            command.push_parameter(Parameter::new(target.clone(), value.clone()));
        }
    }

    command
}

/// Build the batch for all rows, in order.
pub fn build_batch(rows: &[Row], table: &MappingTable, default_command_name: &str) -> CommandBatch {
    let mut batch = CommandBatch::new();
    for row in rows {
        batch.push(build_command(row, table, default_command_name));
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConvertConfig;
    use crate::parser::{parse_str, Delimiter};

    fn build(csv: &str, config: &ConvertConfig) -> CommandBatch {
        let loaded = parse_str(csv, Delimiter::default()).unwrap();
        let table = MappingTable::from_headers(&loaded.headers, config);
        build_batch(&loaded.rows, &table, &config.default_command_name)
    }

    #[test]
    fn test_round_trip_scenario() {
        let batch = build("CommandName,Title [Name],Qty\nCreate,Widget,5\n", &ConvertConfig::default());

        assert_eq!(batch.len(), 1);
        let cmd = &batch.commands[0];
        assert_eq!(cmd.name, "Create");
        assert_eq!(
            cmd.parameters,
            vec![Parameter::new("Name", "Widget"), Parameter::new("Qty", "5")]
        );
    }

    #[test]
    fn test_prefix_scenario() {
        let config = ConvertConfig::default().with_prefix("Qty", "N-");
        let batch = build("CommandName,Title [Name],Qty\nCreate,Widget,5\n", &config);

        assert_eq!(batch.commands[0].parameter("Qty").unwrap().value, "N-5");
        assert_eq!(batch.commands[0].parameter("Name").unwrap().value, "Widget");
    }

    #[test]
    fn test_default_command_name() {
        let config = ConvertConfig::default().with_default_command_name("Upsert");
        let batch = build("CommandName,Qty\n,1\n  ,2\nDelete,3\n", &config);

        let names: Vec<&str> = batch.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Upsert", "Upsert", "Delete"]);
    }

    #[test]
    fn test_whitespace_name_defaults_but_whitespace_value_is_kept() {
        let config = ConvertConfig::default().with_default_command_name("Upsert");
        let batch = build("CommandName,Note\n\"   \",\"   \"\n", &config);

        assert_eq!(batch.commands[0].name, "Upsert");
        assert_eq!(batch.commands[0].parameters, vec![Parameter::new("Note", "")]);
    }

    #[test]
    fn test_empty_default_command_name() {
        let batch = build("Qty\n1\n", &ConvertConfig::default());
        assert_eq!(batch.commands[0].name, "");
    }

    #[test]
    fn test_blank_cells_emit_nothing() {
        let batch = build("A,B,C\n1,,3\n", &ConvertConfig::default());
        let names: Vec<&str> = batch.commands[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_row_without_parameters_still_yields_command() {
        let batch = build("CommandName,A,B\nPing,,\nPing\n", &ConvertConfig::default());

        assert_eq!(batch.len(), 2);
        assert!(batch.commands[0].parameters.is_empty());
        assert!(batch.commands[1].parameters.is_empty());
    }

    #[test]
    fn test_multiple_targets_share_value() {
        let batch = build("X [Y|Z]\nv\n", &ConvertConfig::default());
        assert_eq!(
            batch.commands[0].parameters,
            vec![Parameter::new("Y", "v"), Parameter::new("Z", "v")]
        );
    }

    #[test]
    fn test_ignored_inline_column() {
        let batch = build("X [],Qty\nsecret,1\nother,2\n", &ConvertConfig::default());
        for cmd in &batch {
            assert!(cmd.parameter("X").is_none());
            assert_eq!(cmd.parameters.len(), 1);
        }
    }

    #[test]
    fn test_explicit_mapping_overrides_inline() {
        let config = ConvertConfig::default().with_mapping("X", "W");
        let batch = build("X [Y]\nv\n", &config);
        assert_eq!(batch.commands[0].parameters, vec![Parameter::new("W", "v")]);
    }

    #[test]
    fn test_command_name_column_never_becomes_parameter() {
        let config = ConvertConfig::default().with_mapping("CommandName", "Action");
        let batch = build("CommandName,Qty\nCreate,1\n", &config);

        assert!(batch.commands[0].parameter("Action").is_none());
        assert!(batch.commands[0].parameter("CommandName").is_none());
    }

    #[test]
    fn test_duplicate_targets_allowed() {
        let batch = build("Ref [Id],Alt [Id]\n1,2\n", &ConvertConfig::default());
        let values: Vec<&str> = batch.commands[0].parameters_named("Id").map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_values_trimmed() {
        let batch = build("Title\n\"  Widget  \"\n", &ConvertConfig::default());
        assert_eq!(batch.commands[0].parameters[0].value, "Widget");
    }

    #[test]
    fn test_parameters_follow_header_order() {
        let batch = build("B,A,C\n2,1,3\n", &ConvertConfig::default());
        let names: Vec<&str> = batch.commands[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }
}
