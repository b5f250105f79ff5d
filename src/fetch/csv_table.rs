// src/fetch/csv_table.rs

use csv::ReaderBuilder;
use serde::Deserialize;
use std::borrow::Cow;

use crate::error::LoadError;
use crate::process::RawTable;

/// Byte encoding of the tabular entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1: byte `n` is code point `U+00nn`.
    #[default]
    #[serde(alias = "iso-8859-1", alias = "latin-1")]
    Latin1,
    #[serde(alias = "utf-8")]
    Utf8,
}

impl TextEncoding {
    pub fn decode<'a>(&self, name: &str, bytes: &'a [u8]) -> Result<Cow<'a, str>, LoadError> {
        match self {
            TextEncoding::Latin1 => Ok(match std::str::from_utf8(bytes) {
                // pure ASCII decodes identically, skip the copy
                Ok(ascii) if bytes.is_ascii() => Cow::Borrowed(ascii),
                _ => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
            }),
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|e| LoadError::archive_format(format!("{} is not UTF-8: {}", name, e))),
        }
    }
}

/// Parse one CSV entry. The first record is the header row; short rows are
/// padded with empty cells, rows wider than the header are rejected.
pub fn parse_table(name: &str, content: &[u8], encoding: TextEncoding) -> Result<RawTable, LoadError> {
    let text = encoding.decode(name, content)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LoadError::archive_format(format!("CSV header error in {}: {}", name, e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let width = headers.len();
    let mut table = RawTable::new(headers);

    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| {
            LoadError::archive_format(format!("CSV parse error in {} at record {}: {}", name, idx, e))
        })?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);
            return Err(LoadError::archive_format(format!(
                "{} line {} has {} fields, header has {}",
                name,
                line,
                record.len(),
                width
            )));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        table.rows.push(row);
    }

    Ok(table)
}
