//! Mechanisms of action, linking molecules to their targets
//!
//! Every mechanism lists the chemical ids of all molecules sharing the
//! mechanism and the ids of all targets. The descriptive columns
//! (`mechanismOfAction`, `targetName`, `references`, ...) are never read.

use std::path::Path;

use tracing::debug;

use crate::normalize::{explode, identifier, ChemblId, EnsemblId};
use crate::parser::{tsv, Record};
use crate::ModlocResult;

/// The column with the list of chemical ids
pub const CHEMBL_IDS: &str = "chemblIds";

/// The column with the list of target ids
pub const TARGETS: &str = "targets";

/// The columns of the normalized mechanism table
pub const COLUMNS: [&str; 2] = ["ChemblID", "EnsemblID"];

/// A single link between a molecule and a target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MechanismEdge {
    chembl_id: Option<ChemblId>,
    ensembl_id: EnsemblId,
}

impl MechanismEdge {
    /// Constructs a new `MechanismEdge`
    pub fn new(chembl_id: Option<ChemblId>, ensembl_id: EnsemblId) -> Self {
        Self {
            chembl_id,
            ensembl_id,
        }
    }

    /// The [`ChemblId`] of the molecule, if the mechanism lists any
    pub fn chembl_id(&self) -> Option<&ChemblId> {
        self.chembl_id.as_ref()
    }

    /// The [`EnsemblId`] of the target
    pub fn ensembl_id(&self) -> &EnsemblId {
        &self.ensembl_id
    }
}

/// Normalizes all mechanism records
///
/// Rows without a target are dropped.
///
/// # Errors
///
/// - [`crate::ModlocError::MalformedLiteral`] if a serialized id list cannot be parsed
/// - [`crate::ModlocError::InvalidInput`] if an id list contains nested values
pub fn normalize(records: &[Record]) -> ModlocResult<Vec<MechanismEdge>> {
    let mut res = Vec::new();
    let mut expanded = 0usize;
    for record in records {
        let pairs = expand_record(record)?;
        expanded += pairs.len();
        res.extend(pairs.into_iter().filter_map(|(chembl_id, ensembl_id)| {
            ensembl_id.map(|ensembl_id| MechanismEdge::new(chembl_id, ensembl_id))
        }));
    }
    debug!(
        "Normalized {} mechanism records into {} rows, {} rows without target",
        records.len(),
        res.len(),
        expanded - res.len()
    );
    Ok(res)
}

/// Expands a single mechanism into all pairs of chemical id and target id
///
/// The result contains the full cross product of both lists, in the order of
/// the chemical ids first. A missing or empty list expands to a single `None`,
/// so no pair is lost before rows without target are filtered.
///
/// # Examples
///
/// ```
/// use modloc::normalize::mechanism::expand_record;
/// use modloc::parser::json_lines::parse_line;
///
/// let record = parse_line(r#"{"chemblIds": ["CHEMBL1", "CHEMBL2"],
///     "targets": ["ENSG1", "ENSG2", "ENSG3"], "mechanismOfAction": "inhibitor"}"#).unwrap();
/// assert_eq!(expand_record(&record).unwrap().len(), 6);
///
/// let record = parse_line(r#"{"chemblIds": ["CHEMBL1", "CHEMBL2"], "targets": []}"#).unwrap();
/// let pairs = expand_record(&record).unwrap();
/// assert_eq!(pairs.len(), 2);
/// assert!(pairs.iter().all(|(_, target)| target.is_none()));
/// ```
///
/// # Errors
///
/// See [`normalize`]
pub fn expand_record(record: &Record) -> ModlocResult<Vec<(Option<ChemblId>, Option<EnsemblId>)>> {
    let chembl_ids = explode(record.list(CHEMBL_IDS)?);
    let targets = explode(record.list(TARGETS)?);

    let mut res = Vec::with_capacity(chembl_ids.len() * targets.len());
    for chembl_id in &chembl_ids {
        let chembl_id = match chembl_id {
            Some(value) => identifier(value, CHEMBL_IDS)?.map(ChemblId::from),
            None => None,
        };
        for target in &targets {
            let ensembl_id = match target {
                Some(value) => identifier(value, TARGETS)?.map(EnsemblId::from),
                None => None,
            };
            res.push((chembl_id.clone(), ensembl_id));
        }
    }
    Ok(res)
}

/// Writes the normalized mechanism table
///
/// # Errors
///
/// [`crate::ModlocError::Io`] or [`crate::ModlocError::Csv`] if the file cannot be written
pub fn write_tsv<P: AsRef<Path>>(file: P, edges: &[MechanismEdge]) -> ModlocResult<()> {
    let mut wtr = tsv::create(file)?;
    wtr.write_record(COLUMNS)?;
    for edge in edges {
        wtr.write_record([
            edge.chembl_id().map(ChemblId::as_str).unwrap_or_default(),
            edge.ensembl_id().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
