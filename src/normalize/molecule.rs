//! Molecules and their drug type (modality)
//!
//! Only the chemical id and the drug type are used. Parent and child ids
//! as well as the linked targets are not needed to join molecules to
//! mechanisms, because every chemical id of a mechanism is also listed
//! as a molecule of its own.

use std::path::Path;

use tracing::debug;

use crate::normalize::ChemblId;
use crate::parser::{tsv, Record};
use crate::{ModlocError, ModlocResult};

/// The column holding the modality of a molecule
pub const DRUG_TYPE: &str = "drugType";

/// The columns of the normalized molecule table
pub const COLUMNS: [&str; 2] = ["ChemblID", DRUG_TYPE];

/// A molecule with its drug type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    id: ChemblId,
    drug_type: Option<String>,
}

impl Molecule {
    /// Constructs a new `Molecule`
    pub fn new(id: ChemblId, drug_type: Option<String>) -> Self {
        Self { id, drug_type }
    }

    /// The [`ChemblId`] of the molecule
    pub fn id(&self) -> &ChemblId {
        &self.id
    }

    /// The drug type, e.g. `Small molecule` or `Antibody`
    pub fn drug_type(&self) -> Option<&str> {
        self.drug_type.as_deref()
    }
}

/// Projects every molecule record onto its id and drug type
///
/// # Errors
///
/// [`ModlocError::InvalidInput`] if a record does not have an `id`
pub fn normalize(records: &[Record]) -> ModlocResult<Vec<Molecule>> {
    let res = records
        .iter()
        .map(|record| {
            let id = record.text("id").ok_or_else(|| {
                ModlocError::InvalidInput("molecule record is missing its id".to_string())
            })?;
            Ok(Molecule::new(ChemblId::from(id), record.text(DRUG_TYPE)))
        })
        .collect::<ModlocResult<Vec<Molecule>>>()?;
    debug!("Normalized {} molecules", res.len());
    Ok(res)
}

/// Writes the normalized molecule table
///
/// # Errors
///
/// [`ModlocError::Io`] or [`ModlocError::Csv`] if the file cannot be written
pub fn write_tsv<P: AsRef<Path>>(file: P, molecules: &[Molecule]) -> ModlocResult<()> {
    let mut wtr = tsv::create(file)?;
    wtr.write_record(COLUMNS)?;
    for molecule in molecules {
        wtr.write_record([
            molecule.id().as_str(),
            molecule.drug_type().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
