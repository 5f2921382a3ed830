//! Parameter value extraction.
//!
//! A blank or absent cell yields no value at all (the parameter is
//! omitted, not emitted empty). Otherwise the column prefix, if any, is
//! glued to the raw cell and the result trimmed.

use std::collections::HashMap;

use crate::mapping::ColumnName;

/// Prefix registered for a column, matched on the trimmed or bare name.
pub fn prefix_for<'m>(name: &ColumnName<'_>, prefixes: &'m HashMap<String, String>) -> Option<&'m str> {
    name.lookup(prefixes).map(String::as_str)
}

/// Value for a cell given an already resolved prefix.
///
/// `None` means "emit nothing". The raw value is not trimmed before the
/// prefix is prepended, only the concatenation is.
pub fn extract_value(prefix: Option<&str>, raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|v| !v.is_empty())?;
    let value = match prefix {
        Some(prefix) => format!("{}{}", prefix, raw),
        None => raw.to_string(),
    };
    Some(value.trim().to_string())
}
