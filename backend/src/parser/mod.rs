//! Specification table loader with encoding and delimiter auto-detection.
//!
//! Turns delimited text into a typed [`SpecTable`]: required columns are
//! checked, segment cells are parsed as numbers and empty cells become `None`.

use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{LoadError, LoadResult};
use crate::models::{
    CoefficientValue, RawRow, SpecTable, DESCRIPTION_COLUMN, EXPRESSION_COLUMN, RESERVED_COLUMNS,
};

const UTF8_BOM: char = '\u{feff}';

/// Result of loading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The loaded table
    pub table: SpecTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> LoadResult<String> {
    let content = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| LoadError::Encoding(e.to_string()))?,
        // Windows-1252 agrees with Latin-1 on every printable character
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()
        }
        // Fallback: UTF-8 with lossy conversion
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    Ok(content
        .strip_prefix(UTF8_BOM)
        .map(str::to_string)
        .unwrap_or(content))
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Defaults to `,` when the header holds none of the candidates.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Load a specification table from a file, auto-detecting encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_csv_file_auto("/path/to/spec.csv")?;
/// println!("Segments: {:?}", result.table.segment_columns);
/// ```
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> LoadResult<ParseResult> {
    parse_csv_file(path, None)
}

/// Load a specification table from a file, optionally forcing the delimiter.
pub fn parse_csv_file<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> LoadResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, delimiter)
}

/// Load a specification table from bytes with full auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> LoadResult<ParseResult> {
    parse_bytes(bytes, None)
}

/// Load a specification table from bytes, optionally forcing the delimiter.
pub fn parse_bytes(bytes: &[u8], delimiter: Option<char>) -> LoadResult<ParseResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::EmptyFile);
    }

    // Valid UTF-8 wins over chardet's guess, which is unreliable on short files.
    let encoding = match std::str::from_utf8(bytes) {
        Ok(_) => "utf-8".to_string(),
        Err(_) => match detect_encoding(bytes).as_str() {
            // Already known not to be UTF-8
            "utf-8" => "windows-1252".to_string(),
            other => other.to_string(),
        },
    };
    let content = decode_content(bytes, &encoding)?;
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_table(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse decoded text with an explicit delimiter.
///
/// The first non-blank line is the header. `Description` and `Expression` are
/// required; `Label` and `index` are ignored if present; every other column is
/// a segment column. Short rows are padded with empty cells and extra trailing
/// cells are ignored.
///
/// Only headers and segment cells are trimmed. `Description` and `Expression`
/// are kept as written, and a record of empty cells is still a row.
pub fn parse_table(content: &str, delimiter: char) -> LoadResult<SpecTable> {
    if !delimiter.is_ascii() {
        return Err(LoadError::Parse {
            line: 0,
            message: format!("delimiter '{}' is not a single-byte character", delimiter),
        });
    }
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders);
    }

    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(LoadError::DuplicateColumn(header.clone()));
        }
    }

    let description_idx = column_index(&headers, DESCRIPTION_COLUMN)?;
    let expression_idx = column_index(&headers, EXPRESSION_COLUMN)?;

    let segments: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !RESERVED_COLUMNS.contains(&h.as_str()))
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let mut values = Vec::with_capacity(segments.len());
        for (idx, name) in &segments {
            values.push(parse_value(cell(&record, *idx), line, name)?);
        }

        rows.push(RawRow {
            index: rows.len(),
            description: text_cell(&record, description_idx),
            expression: text_cell(&record, expression_idx),
            values,
        });
    }

    Ok(SpecTable {
        headers,
        segment_columns: segments.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

fn column_index(headers: &[String], name: &str) -> LoadResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn text_cell(record: &StringRecord, idx: usize) -> Option<String> {
    Some(cell(record, idx))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_value(raw: &str, line: usize, column: &str) -> LoadResult<Option<CoefficientValue>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    CoefficientValue::parse(raw)
        .map(Some)
        .ok_or_else(|| LoadError::MalformedNumericCell {
            line,
            column: column.to_string(),
            value: raw.to_string(),
        })
}

fn csv_error(err: csv::Error) -> LoadError {
    LoadError::Parse {
        line: err.position().map(|p| p.line() as usize).unwrap_or(0),
        message: err.to_string(),
    }
}
