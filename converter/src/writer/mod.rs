//! XML serialization of a [`CommandBatch`].
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <CommandBatch xmlns="http://schemas.remotex.net/Apps/201207/Commands">
//!   <Command>
//!     <Name>Create</Name>
//!     <Parameter>
//!       <Name>Name</Name>
//!       <Value>Widget</Value>
//!     </Parameter>
//!   </Command>
//! </CommandBatch>
//! ```
//!
//! The document is serialized to memory first and written in one go, so a
//! failure never leaves a truncated file behind.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{WriteError, WriteResult};
use crate::models::{Command, CommandBatch, Parameter};

/// Namespace of every element in the document.
pub const COMMANDS_NAMESPACE: &str = "http://schemas.remotex.net/Apps/201207/Commands";

const INDENT_SIZE: usize = 2;

/// Serialize the batch into an XML string.
pub fn to_xml_string(batch: &CommandBatch) -> WriteResult<String> {
    let mut buffer = Vec::new();
    write_batch_to(batch, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Serialize the batch into any writer (e.g. stdout).
pub fn write_batch_to<W: Write>(batch: &CommandBatch, inner: W) -> WriteResult<()> {
    let mut writer = Writer::new_with_indent(inner, b' ', INDENT_SIZE);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("CommandBatch").with_attributes([("xmlns", COMMANDS_NAMESPACE)]),
    ))?;
    for command in batch {
        write_command(&mut writer, command)?;
    }
    writer.write_event(Event::End(BytesEnd::new("CommandBatch")))?;

    let mut inner = writer.into_inner();
    inner.write_all(b"\n")?;
    inner.flush()?;
    Ok(())
}

fn write_command<W: Write>(writer: &mut Writer<W>, command: &Command) -> WriteResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Command")))?;
    write_text_element(writer, "Name", &command.name)?;
    for parameter in &command.parameters {
        write_parameter(writer, parameter)?;
    }
    writer.write_event(Event::End(BytesEnd::new("Command")))?;
    Ok(())
}

fn write_parameter<W: Write>(writer: &mut Writer<W>, parameter: &Parameter) -> WriteResult<()> {
    writer.write_event(Event::Start(BytesStart::new("Parameter")))?;
    write_text_element(writer, "Name", &parameter.name)?;
    write_text_element(writer, "Value", &parameter.value)?;
    writer.write_event(Event::End(BytesEnd::new("Parameter")))?;
    Ok(())
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> WriteResult<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Resolve a relative output path against the current working directory.
pub fn resolve_output_path(path: &Path) -> WriteResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| WriteError::ResolvePath {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

/// Write the batch to `path`, creating or overwriting it.
///
/// Returns the absolute path written.
pub fn write_batch(batch: &CommandBatch, path: &Path) -> WriteResult<PathBuf> {
    let resolved = resolve_output_path(path)?;
    let xml = to_xml_string(batch)?;
    std::fs::write(&resolved, xml).map_err(|source| WriteError::Io {
        path: resolved.clone(),
        source,
    })?;
    Ok(resolved)
}
