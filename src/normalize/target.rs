//! Targets and their subcellular locations
//!
//! A target record lists any number of subcellular locations:
//!
//! ```text
//! {"id": "ENSG00000146648", "biotype": "protein_coding",
//!  "subcellularLocations": [
//!     {"location": "Cell membrane", "source": "uniprot", "termSL": "SL-0039", "labelSL": "Cell membrane"},
//!     {"location": "Nucleus:Nucleoplasm", "source": "HPA_main", "termSL": "SL-0190", "labelSL": "Nucleoplasm"}
//! ]}
//! ```
//!
//! which is expanded into one [`TargetLocation`] per location. The raw
//! location can be prefixed by a qualifier, separated by `:`. Only the part
//! after the qualifier is kept.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::normalize::{explode, EnsemblId};
use crate::parser::{tsv, Record};
use crate::{ModlocError, ModlocResult};

/// The column of the target dataset with the list of locations
pub const SUBCELLULAR_LOCATIONS: &str = "subcellularLocations";

/// The columns of the normalized target table
pub const COLUMNS: [&str; 4] = [
    "id",
    "biotype",
    "subcellular_location",
    "subcellular_location_label",
];

/// One subcellular location of a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    id: EnsemblId,
    biotype: Option<String>,
    location: String,
    label: Option<String>,
}

impl TargetLocation {
    /// Constructs a new `TargetLocation`
    pub fn new(id: EnsemblId, biotype: Option<String>, location: String, label: Option<String>) -> Self {
        Self {
            id,
            biotype,
            location,
            label,
        }
    }

    /// The [`EnsemblId`] of the target
    pub fn id(&self) -> &EnsemblId {
        &self.id
    }

    /// The biotype of the target, e.g. `protein_coding`
    pub fn biotype(&self) -> Option<&str> {
        self.biotype.as_deref()
    }

    /// The location without its qualifier
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The human readable label of the location
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Normalizes all target records
///
/// # Errors
///
/// - [`ModlocError::MalformedLiteral`] if a serialized location list cannot be parsed
/// - [`ModlocError::InvalidInput`] if a record without `id` has locations, or
///   a location is not an object with a `location` string
pub fn normalize(records: &[Record]) -> ModlocResult<Vec<TargetLocation>> {
    let mut res = Vec::new();
    for record in records {
        res.extend(expand_record(record)?);
    }
    debug!(
        "Normalized {} target records into {} target locations",
        records.len(),
        res.len()
    );
    Ok(res)
}

/// Expands a single target record into one row per subcellular location
///
/// Records without locations do not produce any row.
///
/// # Examples
///
/// ```
/// use modloc::normalize::target::expand_record;
/// use modloc::parser::json_lines::parse_line;
///
/// let record = parse_line(r#"{"id": "ENSG1", "biotype": "protein_coding",
///     "subcellularLocations": [
///         {"location": "Cytosol", "labelSL": "Cytosol"},
///         {"location": "Nucleus: Nucleoplasm", "labelSL": "Nucleoplasm"}
///     ]}"#).unwrap();
///
/// let rows = expand_record(&record).unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1].location(), "Nucleoplasm");
/// assert_eq!(rows[1].label(), Some("Nucleoplasm"));
/// ```
///
/// # Errors
///
/// See [`normalize`]
pub fn expand_record(record: &Record) -> ModlocResult<Vec<TargetLocation>> {
    let Some(locations) = record.list(SUBCELLULAR_LOCATIONS)? else {
        return Ok(Vec::new());
    };
    let entries: Vec<Value> = explode(Some(locations)).into_iter().flatten().collect();
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let id = EnsemblId::from(record.text("id").ok_or_else(|| {
        ModlocError::InvalidInput("target record with locations is missing its id".to_string())
    })?);
    let biotype = record.text("biotype");

    entries
        .iter()
        .map(|entry| {
            let (location, label) = location_values(entry)?;
            Ok(TargetLocation::new(id.clone(), biotype.clone(), location, label))
        })
        .collect()
}

/// Returns the location without qualifier and the label of one location entry
fn location_values(entry: &Value) -> ModlocResult<(String, Option<String>)> {
    let Value::Object(map) = entry else {
        return Err(ModlocError::InvalidInput(format!(
            "subcellular location must be an object, found {entry}"
        )));
    };
    let Some(raw) = map.get("location").and_then(Value::as_str) else {
        return Err(ModlocError::InvalidInput(format!(
            "subcellular location without location string: {entry}"
        )));
    };
    let label = map
        .get("labelSL")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok((strip_qualifier(raw), label))
}

/// Removes the qualifier from a raw location
///
/// Everything after the first `:` is kept and trimmed. Locations without
/// a qualifier are returned unchanged.
///
/// # Examples
///
/// ```
/// use modloc::normalize::target::strip_qualifier;
///
/// assert_eq!(strip_qualifier("Nucleus: Nucleoplasm"), "Nucleoplasm");
/// assert_eq!(strip_qualifier(" Cytosol "), " Cytosol ");
/// ```
pub fn strip_qualifier(raw: &str) -> String {
    match raw.split_once(':') {
        Some((_, location)) => location.trim().to_string(),
        None => raw.to_string(),
    }
}

/// Writes the normalized target table
///
/// # Errors
///
/// [`ModlocError::Io`] or [`ModlocError::Csv`] if the file cannot be written
pub fn write_tsv<P: AsRef<Path>>(file: P, targets: &[TargetLocation]) -> ModlocResult<()> {
    let mut wtr = tsv::create(file)?;
    wtr.write_record(COLUMNS)?;
    for target in targets {
        wtr.write_record([
            target.id().as_str(),
            target.biotype().unwrap_or_default(),
            target.location(),
            target.label().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::json_lines::parse_line;
    use crate::parser::tsv;

    #[test]
    fn one_row_per_location() {
        let rec = parse_line(
            r#"{"id": "ENSG1", "biotype": "protein_coding", "alternativeGenes": ["ENSG9"], "subcellularLocations": [
                {"location": "Cytosol", "labelSL": "Cytosol"},
                {"location": "Nucleus", "labelSL": "Nucleus"},
                {"location": "Plasma membrane", "labelSL": null}
            ]}"#,
        )
        .unwrap();
        let rows = expand_record(&rec).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.id().as_str() == "ENSG1"));
        assert!(rows.iter().all(|row| row.biotype() == Some("protein_coding")));
        assert_eq!(rows[2].location(), "Plasma membrane");
        assert!(rows[2].label().is_none());
    }

    #[test]
    fn no_rows_without_locations() {
        for line in [
            r#"{"id": "ENSG1", "biotype": "protein_coding"}"#,
            r#"{"id": "ENSG1", "subcellularLocations": null}"#,
            r#"{"id": "ENSG1", "subcellularLocations": []}"#,
            r#"{"id": "ENSG1", "subcellularLocations": [null]}"#,
        ] {
            let rec = parse_line(line).unwrap();
            assert!(expand_record(&rec).unwrap().is_empty(), "{line}");
        }
    }

    #[test]
    fn null_entries_are_dropped() {
        let rec = parse_line(
            r#"{"id": "ENSG1", "subcellularLocations": [null, {"location": "Cytosol", "labelSL": "Cytosol"}]}"#,
        )
        .unwrap();
        assert_eq!(expand_record(&rec).unwrap().len(), 1);
    }

    #[test]
    fn serialized_locations() {
        let input = "id\tbiotype\tsubcellularLocations\n\
            ENSG1\tprotein_coding\t[{'location': 'Nucleus:Nucleoli', 'labelSL': 'Nucleoli'}, {'location': 'Cytosol', 'labelSL': 'Cytosol'}]\n\
            ENSG2\tprotein_coding\t\n";
        let records = tsv::read_from(input.as_bytes()).unwrap();
        let rows = normalize(&records).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].location(), "Nucleoli");
        assert_eq!(rows[1].location(), "Cytosol");
    }

    #[test]
    fn qualifiers() {
        assert_eq!(strip_qualifier("Nucleus:Nucleoli"), "Nucleoli");
        assert_eq!(strip_qualifier("Nucleus: Nucleoli rim "), "Nucleoli rim");
        assert_eq!(strip_qualifier("a:b:c"), "b:c");
        assert_eq!(strip_qualifier("Cytosol"), "Cytosol");
    }

    #[test]
    fn invalid_locations() {
        let rec = parse_line(r#"{"id": "ENSG1", "subcellularLocations": ["Cytosol"]}"#).unwrap();
        assert!(matches!(expand_record(&rec), Err(ModlocError::InvalidInput(_))));

        let rec = parse_line(r#"{"id": "ENSG1", "subcellularLocations": [{"labelSL": "Cytosol"}]}"#).unwrap();
        assert!(matches!(expand_record(&rec), Err(ModlocError::InvalidInput(_))));

        let rec = parse_line(r#"{"subcellularLocations": [{"location": "Cytosol"}]}"#).unwrap();
        assert!(matches!(expand_record(&rec), Err(ModlocError::InvalidInput(_))));
    }
}
