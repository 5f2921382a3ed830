//! CSV loader.
//!
//! Reads a header-first CSV into [`Row`]s. Column order comes from the
//! header and is shared by every row. Input is expected to be UTF-8;
//! transcoding is left to whoever produced the file.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{CsvError, CsvResult};
use crate::models::Row;

/// Field separator used when reading the CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Fixed single-byte separator.
    Char(u8),
    /// Guess from the header line, see [`detect_delimiter`].
    Auto,
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Char(b',')
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Delimiter::Auto),
            "\\t" | "tab" | "TAB" | "\t" => Ok(Delimiter::Char(b'\t')),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(Delimiter::Char(c as u8)),
                    _ => Err(format!("expected a single ASCII character or 'auto', got '{}'", s)),
                }
            }
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Auto => write!(f, "auto"),
            Delimiter::Char(b'\t') => write!(f, "TAB"),
            Delimiter::Char(c) => write!(f, "{}", *c as char),
        }
    }
}

/// Result of loading with metadata
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Column headers, in discovery order
    pub headers: Vec<String>,
    /// Loaded records
    pub rows: Vec<Row>,
    /// Separator actually used
    pub delimiter: u8,
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Text inside `[...]` is skipped so inline mappings such as
/// `Title [Name|Alt]` do not vote for `|`. Ties favour the comma.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let mut counts = [(b',', 0usize), (b';', 0), (b'\t', 0), (b'|', 0)];
    let mut depth = 0usize;
    for c in first_line.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                for (sep, count) in counts.iter_mut() {
                    if c == *sep as char {
                        *count += 1;
                    }
                }
            }
            _ => {}
        }
    }

    let mut best = (b',', 0usize);
    for &(sep, count) in &counts {
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

/// Parse CSV text into rows.
///
/// # Example
/// ```ignore
/// use csv2batch::parse_str;
///
/// let result = parse_str("name,age\nAlice,30", Delimiter::default()).unwrap();
/// assert_eq!(result.rows[0].get("name"), Some("Alice"));
/// ```
pub fn parse_str(content: &str, delimiter: Delimiter) -> CsvResult<LoadResult> {
    let delimiter = match delimiter {
        Delimiter::Char(c) => c,
        Delimiter::Auto => detect_delimiter(content.trim_start_matches('\u{feff}')),
    };
    parse_csv(content.as_bytes(), delimiter)
}

/// Parse CSV from a reader with an explicit delimiter.
pub fn parse_csv<R: Read>(reader: R, delimiter: u8) -> CsvResult<LoadResult> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let header_record = rdr.headers().map_err(CsvError::from_csv)?.clone();
    if header_record.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let headers: Vec<String> = header_record
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let shared: Arc<[String]> = headers.clone().into();
    let mut rows = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(CsvError::from_csv)?;
        let values: Vec<String> = record
            .iter()
            .take(shared.len())
            .map(str::to_string)
            .collect();
        rows.push(Row::new(Arc::clone(&shared), values));
    }

    Ok(LoadResult {
        headers,
        rows,
        delimiter,
    })
}

/// Load a CSV file.
///
/// With [`Delimiter::Auto`] the file is read once into memory so the
/// header line can be inspected before parsing.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> CsvResult<LoadResult> {
    let path = path.as_ref();
    let io_err = |source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    };

    match delimiter {
        Delimiter::Char(c) => {
            let file = std::fs::File::open(path).map_err(io_err)?;
            parse_csv(std::io::BufReader::new(file), c)
        }
        Delimiter::Auto => {
            // Bytes go to the csv reader untouched so bad UTF-8 is reported with its line.
            let bytes = std::fs::read(path).map_err(io_err)?;
            let header = String::from_utf8_lossy(&bytes);
            let detected = detect_delimiter(header.trim_start_matches('\u{feff}'));
            parse_csv(bytes.as_slice(), detected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let result = parse_str("name,age\nAlice,30\nBob,25", Delimiter::default()).unwrap();

        assert_eq!(result.headers, vec!["name", "age"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("name"), Some("Alice"));
        assert_eq!(result.rows[1].get("age"), Some("25"));
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name,value\n\"Smith, Alice\",\"Hello \"\"World\"\"\"";
        let result = parse_str(csv, Delimiter::default()).unwrap();

        assert_eq!(result.rows[0].get("name"), Some("Smith, Alice"));
        assert_eq!(result.rows[0].get("value"), Some("Hello \"World\""));
    }

    #[test]
    fn test_values_are_not_trimmed() {
        let result = parse_str("a,b\n  x  ,y", Delimiter::default()).unwrap();
        assert_eq!(result.rows[0].get("a"), Some("  x  "));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let result = parse_str("a,b\n1,2\n\n3,4\n", Delimiter::default()).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_short_records_have_absent_cells() {
        let result = parse_str("a,b,c\n1", Delimiter::default()).unwrap();

        assert_eq!(result.rows[0].get("a"), Some("1"));
        assert_eq!(result.rows[0].get("b"), None);
    }

    #[test]
    fn test_extra_cells_dropped() {
        let result = parse_str("a,b\n1,2,3,4", Delimiter::default()).unwrap();
        assert_eq!(result.rows[0].iter().count(), 2);
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let result = parse_str("\u{feff}CommandName,Qty\nCreate,5", Delimiter::default()).unwrap();
        assert_eq!(result.headers[0], "CommandName");
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_str("", Delimiter::default()).unwrap_err();
        assert!(matches!(err, CsvError::EmptyFile));
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let result = parse_str("a,b\n", Delimiter::default()).unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.headers.len(), 2);
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
    }

    #[test]
    fn test_detect_delimiter_ignores_bracket_content() {
        assert_eq!(detect_delimiter("Id,Title [Name|Alt|Other]"), b',');
    }

    #[test]
    fn test_detect_delimiter_defaults_to_comma() {
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_str("name;age\nAlice;30", Delimiter::Auto).unwrap();
        assert_eq!(result.delimiter, b';');
        assert_eq!(result.rows[0].get("age"), Some("30"));
    }

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("auto".parse::<Delimiter>().unwrap(), Delimiter::Auto);
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::Char(b';'));
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::Char(b'\t'));
        assert!(";;".parse::<Delimiter>().is_err());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "CommandName,Qty\nCreate,5\n").unwrap();

        let result = parse_csv_file(file.path(), Delimiter::default()).unwrap();
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error_in_every_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"CommandName,Title\nCreate,Caf\xe9\n").unwrap();

        for delimiter in [Delimiter::default(), Delimiter::Auto] {
            let err = parse_csv_file(file.path(), delimiter).unwrap_err();
            match err {
                CsvError::Parse { line, message } => {
                    assert_eq!(line, 2);
                    assert!(message.contains("transcode"));
                }
                other => panic!("unexpected error for {delimiter}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_auto_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}CommandName;Title [Name|Alt]\nCreate;Widget\n").unwrap();

        let result = parse_csv_file(file.path(), Delimiter::Auto).unwrap();
        assert_eq!(result.delimiter, b';');
        assert_eq!(result.headers, vec!["CommandName", "Title [Name|Alt]"]);
        assert_eq!(result.rows[0].get("CommandName"), Some("Create"));
    }

    #[test]
    fn test_missing_file() {
        let err = parse_csv_file("/definitely/not/here.csv", Delimiter::default()).unwrap_err();
        assert!(matches!(err, CsvError::Io { .. }));
        assert!(err.to_string().contains("here.csv"));
    }
}
