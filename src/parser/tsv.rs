//! Tab-delimited tables with a header row
//!
//! This is the format of all intermediate tables and of the combined
//! observation table. Missing values are written as empty cells.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, Writer, WriterBuilder};
use serde_json::Value;
use tracing::debug;

use crate::parser::Record;
use crate::{ModlocError, ModlocResult};

/// Cell values that mark missing data
const MISSING_MARKERS: [&str; 9] = ["", "NaN", "nan", "NA", "N/A", "null", "NULL", "None", "<NA>"];

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

/// Reads a tab-delimited file into [`Record`]s
///
/// Every cell becomes a string value, cells with a missing-data marker
/// (empty, `NaN`, `None`, ...) become null.
///
/// # Errors
///
/// - [`ModlocError::CannotOpenFile`] if the file cannot be opened
/// - [`ModlocError::Csv`] if a row does not match the header
pub fn read<P: AsRef<Path>>(file: P) -> ModlocResult<Vec<Record>> {
    let filename = file.as_ref().display().to_string();
    let file = File::open(file).map_err(|_| ModlocError::CannotOpenFile(filename.clone()))?;
    let records = read_from(file)?;
    debug!("Read {} rows from {}", records.len(), filename);
    Ok(records)
}

/// Reads tab-delimited data from any reader
pub fn read_from<R: Read>(reader: R) -> ModlocResult<Vec<Record>> {
    let (header, rows) = read_table(reader)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut record = Record::new();
            for (key, cell) in header.iter().zip(row) {
                record.insert(key.as_str(), cell.map_or(Value::Null, Value::String));
            }
            record
        })
        .collect())
}

/// Reads tab-delimited data as header and rows of optional cells
pub(crate) fn read_table<R: Read>(reader: R) -> ModlocResult<(Vec<String>, Vec<Vec<Option<String>>>)> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push(
            row.iter()
                .map(|cell| (!is_missing(cell)).then(|| cell.to_string()))
                .collect(),
        );
    }
    Ok((header, rows))
}

/// Creates a tab-delimited writer
pub fn writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .from_writer(inner)
}

/// Creates a tab-delimited writer for a new file
///
/// # Errors
///
/// [`ModlocError::Io`] if the file cannot be created
pub fn create<P: AsRef<Path>>(file: P) -> ModlocResult<Writer<File>> {
    Ok(writer(File::create(file)?))
}
