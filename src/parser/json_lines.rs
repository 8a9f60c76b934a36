//! Newline-delimited JSON sources
//!
//! ```text
//! {"id": "CHEMBL1201583", "drugType": "Antibody", "linkedTargets": {"rows": ["ENSG00000146648"], "count": 1}}
//! {"id": "CHEMBL1201584", "drugType": "Small molecule", "linkedTargets": null}
//! ```
//!
//! Nested objects are flattened into dotted column names, so the first line
//! becomes a [`Record`] with the columns `id`, `drugType`,
//! `linkedTargets.rows` and `linkedTargets.count`. Arrays are kept as they are.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::parser::Record;
use crate::{ModlocError, ModlocResult};

/// Reads a newline-delimited JSON file
///
/// Blank lines are skipped.
///
/// # Errors
///
/// - [`ModlocError::CannotOpenFile`] if the file cannot be opened
/// - [`ModlocError::InvalidInput`] if a line is not a JSON object
pub fn read<P: AsRef<Path>>(file: P) -> ModlocResult<Vec<Record>> {
    let filename = file.as_ref().display().to_string();
    let file = File::open(file).map_err(|_| ModlocError::CannotOpenFile(filename.clone()))?;
    let records = read_from(BufReader::new(file), &filename)?;
    debug!("Read {} records from {}", records.len(), filename);
    Ok(records)
}

/// Reads newline-delimited JSON from any buffered reader
///
/// `source` is only used to point to the failing input in error messages.
pub fn read_from<R: BufRead>(reader: R, source: &str) -> ModlocResult<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_line(&line)
            .map_err(|err| ModlocError::InvalidInput(format!("{source}:{}: {err}", idx + 1)))?;
        records.push(record);
    }
    Ok(records)
}

/// Parses a single JSON object into a flat [`Record`]
///
/// # Errors
///
/// [`ModlocError::InvalidInput`] if the line is not valid JSON or not an object
pub fn parse_line(line: &str) -> ModlocResult<Record> {
    let value: Value = serde_json::from_str(line)
        .map_err(|err| ModlocError::InvalidInput(format!("invalid JSON ({err})")))?;
    let Value::Object(map) = value else {
        return Err(ModlocError::InvalidInput(
            "every line must contain a JSON object".to_string(),
        ));
    };
    let mut flat = Map::new();
    flatten(None, map, &mut flat);
    Ok(Record::from(flat))
}

fn flatten(prefix: Option<&str>, map: Map<String, Value>, flat: &mut Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten(Some(&key), inner, flat),
            value => {
                flat.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects() {
        let rec = parse_line(
            r#"{"id": "CHEMBL1", "linkedTargets": {"rows": ["ENSG1"], "count": 1, "meta": {"a": 1}}}"#,
        )
        .unwrap();
        assert_eq!(rec.get("id"), Some(&json!("CHEMBL1")));
        assert_eq!(rec.get("linkedTargets.rows"), Some(&json!(["ENSG1"])));
        assert_eq!(rec.get("linkedTargets.count"), Some(&json!(1)));
        assert_eq!(rec.get("linkedTargets.meta.a"), Some(&json!(1)));
        assert!(rec.get("linkedTargets").is_none());
        assert_eq!(rec.len(), 4);
    }

    #[test]
    fn keeps_arrays_of_objects() {
        let rec = parse_line(
            r#"{"id": "ENSG1", "subcellularLocations": [{"location": "Nucleus", "labelSL": "Nucleus"}]}"#,
        )
        .unwrap();
        assert_eq!(
            rec.list("subcellularLocations").unwrap().unwrap(),
            vec![json!({"location": "Nucleus", "labelSL": "Nucleus"})]
        );
    }

    #[test]
    fn keeps_marker_strings() {
        let rec = parse_line(r#"{"id": "CHEMBL1", "drugType": "NA"}"#).unwrap();
        assert_eq!(rec.text("drugType").as_deref(), Some("NA"));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(parse_line("[1, 2]").is_err());
        assert!(parse_line("{\"id\": ").is_err());
    }

    #[test]
    fn skips_blank_lines_and_reports_line_numbers() {
        let input = "{\"id\": \"A\"}\n\n{\"id\": \"B\"}\n";
        let records = read_from(input.as_bytes(), "inline").unwrap();
        assert_eq!(records.len(), 2);

        let input = "{\"id\": \"A\"}\nnot json\n";
        match read_from(input.as_bytes(), "inline") {
            Err(ModlocError::InvalidInput(msg)) => assert!(msg.starts_with("inline:2:")),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }
}
