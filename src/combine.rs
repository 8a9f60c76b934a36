//! Joining molecules, mechanisms and targets into one observation table
//!
//! ```text
//! MechanismEdge  ──ChemblID──▶  Molecule   (drug type)
//!       │
//!       └───────EnsemblID──▶  TargetLocation   (subcellular location)
//! ```
//!
//! Both joins are inner joins: drugs without a mechanism, mechanisms
//! without a known molecule and targets without a drug do not produce any
//! observation. The number of dropped rows is reported in [`JoinDiagnostics`].

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use tracing::{debug, info};

use crate::normalize::{ChemblId, EnsemblId, MechanismEdge, Molecule, TargetLocation};
use crate::parser::tsv;
use crate::{ModlocError, ModlocResult};

/// The columns of the combined observation table
pub const COLUMNS: [&str; 6] = [
    "ChemblID",
    "EnsemblID",
    "drugType",
    "biotype",
    "subcellular_location",
    "subcellular_location_label",
];

/// A table of observations, each linking one drug to one target location
///
/// The table is column-agnostic, so that a pre-combined file with additional
/// columns can be analysed as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ObservationTable {
    /// Constructs a new table
    ///
    /// # Errors
    ///
    /// [`ModlocError::InvalidInput`] if a row does not have one cell per column
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> ModlocResult<Self> {
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(ModlocError::InvalidInput(format!(
                "row with {} cells in a table with {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Reads a tab-delimited observation table, e.g. a previously saved `combined_data.tsv`
    ///
    /// # Errors
    ///
    /// - [`ModlocError::CannotOpenFile`] if the file cannot be opened
    /// - [`ModlocError::Csv`] if the file is malformed
    pub fn from_tsv<P: AsRef<Path>>(file: P) -> ModlocResult<Self> {
        let filename = file.as_ref().display().to_string();
        let file = File::open(file).map_err(|_| ModlocError::CannotOpenFile(filename.clone()))?;
        let (columns, rows) = tsv::read_table(file)?;
        debug!("Read {} observations from {}", rows.len(), filename);
        Self::new(columns, rows)
    }

    /// Writes the table as tab-delimited file
    ///
    /// # Errors
    ///
    /// [`ModlocError::Io`] or [`ModlocError::Csv`] if the file cannot be written
    pub fn write_tsv<P: AsRef<Path>>(&self, file: P) -> ModlocResult<()> {
        let mut wtr = tsv::create(file)?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or_default()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// The column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The number of observations
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table does not contain any observation
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates the values of one column
    ///
    /// # Errors
    ///
    /// [`ModlocError::UnknownColumn`] if the table does not have the column
    pub fn column(&self, name: &str) -> ModlocResult<impl Iterator<Item = Option<&str>>> {
        let idx = self
            .columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ModlocError::UnknownColumn(name.to_string()))?;
        Ok(self.rows.iter().map(move |row| row[idx].as_deref()))
    }
}

/// The number of rows dropped by each of the two inner joins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinDiagnostics {
    /// Mechanism rows whose chemical id is not a known molecule
    pub mechanisms_without_molecule: usize,
    /// Molecules not used by any mechanism
    pub molecules_without_mechanism: usize,
    /// Joined drug-target rows whose target has no subcellular location
    pub drugs_without_target: usize,
    /// Target locations not linked to any drug
    pub targets_without_drug: usize,
}

/// One drug-target link after the first join
struct DrugEdge<'a> {
    chembl_id: &'a ChemblId,
    ensembl_id: &'a EnsemblId,
    drug_type: Option<&'a str>,
}

/// Joins the three normalized tables into the observation table
///
/// Mechanisms are joined to molecules on their [`ChemblId`], the result is
/// joined to target locations on the [`EnsemblId`]. The row order follows
/// the mechanism table, matches of one key are kept in the order of the
/// joined table.
///
/// # Examples
///
/// ```
/// use modloc::combine::combine;
/// use modloc::normalize::{ChemblId, EnsemblId, MechanismEdge, Molecule, TargetLocation};
///
/// let mechanisms = vec![
///     MechanismEdge::new(Some(ChemblId::from("CHEMBL1")), EnsemblId::from("ENSG1")),
///     MechanismEdge::new(Some(ChemblId::from("CHEMBL404")), EnsemblId::from("ENSG1")),
/// ];
/// let molecules = vec![Molecule::new(ChemblId::from("CHEMBL1"), Some("Antibody".to_string()))];
/// let targets = vec![
///     TargetLocation::new(EnsemblId::from("ENSG1"), None, "Nucleus".to_string(), None),
///     TargetLocation::new(EnsemblId::from("ENSG1"), None, "Cytosol".to_string(), None),
/// ];
///
/// let (observations, diagnostics) = combine(&mechanisms, &molecules, &targets);
/// assert_eq!(observations.len(), 2);
/// assert_eq!(diagnostics.mechanisms_without_molecule, 1);
/// ```
pub fn combine(
    mechanisms: &[MechanismEdge],
    molecules: &[Molecule],
    targets: &[TargetLocation],
) -> (ObservationTable, JoinDiagnostics) {
    let mut diagnostics = JoinDiagnostics::default();

    let mut molecules_by_id: HashMap<&ChemblId, Vec<&Molecule>> = HashMap::new();
    for molecule in molecules {
        molecules_by_id.entry(molecule.id()).or_default().push(molecule);
    }

    let mut used_molecules: HashSet<&ChemblId> = HashSet::new();
    let mut drugs: Vec<DrugEdge> = Vec::new();
    for edge in mechanisms {
        let matches = edge.chembl_id().and_then(|id| molecules_by_id.get(id));
        let Some(matches) = matches else {
            diagnostics.mechanisms_without_molecule += 1;
            continue;
        };
        for molecule in matches {
            used_molecules.insert(molecule.id());
            drugs.push(DrugEdge {
                chembl_id: molecule.id(),
                ensembl_id: edge.ensembl_id(),
                drug_type: molecule.drug_type(),
            });
        }
    }
    diagnostics.molecules_without_mechanism = molecules
        .iter()
        .filter(|molecule| !used_molecules.contains(molecule.id()))
        .count();

    let mut targets_by_id: HashMap<&EnsemblId, Vec<&TargetLocation>> = HashMap::new();
    for target in targets {
        targets_by_id.entry(target.id()).or_default().push(target);
    }

    let mut used_targets: HashSet<&EnsemblId> = HashSet::new();
    let mut rows = Vec::new();
    for drug in &drugs {
        let Some(matches) = targets_by_id.get(drug.ensembl_id) else {
            diagnostics.drugs_without_target += 1;
            continue;
        };
        used_targets.insert(drug.ensembl_id);
        for target in matches {
            rows.push(vec![
                Some(drug.chembl_id.to_string()),
                Some(drug.ensembl_id.to_string()),
                drug.drug_type.map(str::to_string),
                target.biotype().map(str::to_string),
                Some(target.location().to_string()),
                target.label().map(str::to_string),
            ]);
        }
    }
    diagnostics.targets_without_drug = targets
        .iter()
        .filter(|target| !used_targets.contains(target.id()))
        .count();

    info!(
        "Combined {} observations. Dropped: {} mechanism rows without molecule, {} molecules without mechanism, {} drug rows without target location, {} target locations without drug",
        rows.len(),
        diagnostics.mechanisms_without_molecule,
        diagnostics.molecules_without_mechanism,
        diagnostics.drugs_without_target,
        diagnostics.targets_without_drug,
    );

    let table = ObservationTable {
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    };
    (table, diagnostics)
}

/// Sizes of two identifier sets and their overlap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOverlap {
    /// Identifiers only present in the first set
    pub left_only: usize,
    /// Identifiers present in both sets
    pub shared: usize,
    /// Identifiers only present in the second set
    pub right_only: usize,
}

impl SetOverlap {
    fn new<T: Eq + std::hash::Hash>(left: &HashSet<T>, right: &HashSet<T>) -> Self {
        let shared = left.intersection(right).count();
        Self {
            left_only: left.len() - shared,
            shared,
            right_only: right.len() - shared,
        }
    }
}

/// How well the identifier spaces of the datasets match each other
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdOverlap {
    /// Chemical ids of mechanisms (left) vs. molecules (right)
    pub chembl: SetOverlap,
    /// Target ids of mechanisms (left) vs. target locations (right)
    pub ensembl: SetOverlap,
}

/// Compares the distinct identifiers used by the normalized tables
///
/// # Examples
///
/// ```
/// use modloc::combine::id_overlap;
/// use modloc::normalize::{ChemblId, EnsemblId, MechanismEdge, Molecule};
///
/// let mechanisms = vec![
///     MechanismEdge::new(Some(ChemblId::from("CHEMBL1")), EnsemblId::from("ENSG1")),
///     MechanismEdge::new(Some(ChemblId::from("CHEMBL2")), EnsemblId::from("ENSG1")),
/// ];
/// let molecules = vec![Molecule::new(ChemblId::from("CHEMBL1"), None)];
///
/// let overlap = id_overlap(&mechanisms, &molecules, &[]);
/// assert_eq!(overlap.chembl.shared, 1);
/// assert_eq!(overlap.chembl.left_only, 1);
/// assert_eq!(overlap.ensembl.left_only, 1);
/// ```
pub fn id_overlap(
    mechanisms: &[MechanismEdge],
    molecules: &[Molecule],
    targets: &[TargetLocation],
) -> IdOverlap {
    let mechanism_chembl: HashSet<&ChemblId> =
        mechanisms.iter().filter_map(MechanismEdge::chembl_id).collect();
    let molecule_chembl: HashSet<&ChemblId> = molecules.iter().map(Molecule::id).collect();
    let mechanism_ensembl: HashSet<&EnsemblId> =
        mechanisms.iter().map(MechanismEdge::ensembl_id).collect();
    let target_ensembl: HashSet<&EnsemblId> = targets.iter().map(TargetLocation::id).collect();

    let overlap = IdOverlap {
        chembl: SetOverlap::new(&mechanism_chembl, &molecule_chembl),
        ensembl: SetOverlap::new(&mechanism_ensembl, &target_ensembl),
    };
    debug!("Identifier overlap: {:?}", overlap);
    overlap
}

#[cfg(test)]
mod test {
    use super::*;

    fn mechanism(chembl: &str, ensembl: &str) -> MechanismEdge {
        MechanismEdge::new(Some(ChemblId::from(chembl)), EnsemblId::from(ensembl))
    }

    fn molecule(chembl: &str, drug_type: &str) -> Molecule {
        Molecule::new(ChemblId::from(chembl), Some(drug_type.to_string()))
    }

    fn target(ensembl: &str, location: &str) -> TargetLocation {
        TargetLocation::new(
            EnsemblId::from(ensembl),
            Some("protein_coding".to_string()),
            location.to_string(),
            Some(location.to_string()),
        )
    }

    #[test]
    fn inner_join_cardinality() {
        // 2 molecules, 2 mechanisms, 2 targets. Mechanism 2 points to a
        // target that has no subcellular location.
        let mechanisms = vec![
            mechanism("C1", "E1"),
            mechanism("C1", "E3"),
            mechanism("C2", "E1"),
            mechanism("C2", "E2"),
        ];
        let molecules = vec![molecule("C1", "Antibody"), molecule("C2", "Small molecule")];
        let targets = vec![target("E1", "Nucleus"), target("E2", "Cytosol")];

        let (table, diagnostics) = combine(&mechanisms, &molecules, &targets);
        assert_eq!(table.len(), 3);
        assert_eq!(
            diagnostics,
            JoinDiagnostics {
                mechanisms_without_molecule: 0,
                molecules_without_mechanism: 0,
                drugs_without_target: 1,
                targets_without_drug: 0,
            }
        );
        let drugs: Vec<_> = table.column("ChemblID").unwrap().collect();
        assert_eq!(drugs, vec![Some("C1"), Some("C2"), Some("C2")]);
        let locations: Vec<_> = table.column("subcellular_location").unwrap().collect();
        assert_eq!(locations, vec![Some("Nucleus"), Some("Nucleus"), Some("Cytosol")]);
    }

    #[test]
    fn one_to_many_matches_multiply() {
        let mechanisms = vec![mechanism("C1", "E1"), mechanism("C1", "E1")];
        let molecules = vec![molecule("C1", "Antibody")];
        let targets = vec![
            target("E1", "Nucleus"),
            target("E1", "Cytosol"),
            target("E1", "Golgi apparatus"),
        ];
        let (table, _) = combine(&mechanisms, &molecules, &targets);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn unmatched_rows_are_counted() {
        let mechanisms = vec![
            mechanism("C1", "E1"),
            mechanism("C404", "E1"),
            MechanismEdge::new(None, EnsemblId::from("E1")),
        ];
        let molecules = vec![molecule("C1", "Antibody"), molecule("C2", "Protein")];
        let targets = vec![target("E1", "Nucleus"), target("E9", "Cytosol")];

        let (table, diagnostics) = combine(&mechanisms, &molecules, &targets);
        assert_eq!(table.len(), 1);
        assert_eq!(diagnostics.mechanisms_without_molecule, 2);
        assert_eq!(diagnostics.molecules_without_mechanism, 1);
        assert_eq!(diagnostics.drugs_without_target, 0);
        assert_eq!(diagnostics.targets_without_drug, 1);
    }

    #[test]
    fn missing_column() {
        let table = ObservationTable::default();
        assert!(matches!(
            table.column("drugType"),
            Err(ModlocError::UnknownColumn(_))
        ));
    }

    #[test]
    fn ragged_rows() {
        let res = ObservationTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Some("1".to_string())]],
        );
        assert!(res.is_err());
    }

    #[test]
    fn overlap() {
        let mechanisms = vec![mechanism("C1", "E1"), mechanism("C2", "E2")];
        let molecules = vec![molecule("C1", "Antibody"), molecule("C3", "Protein")];
        let targets = vec![target("E1", "Nucleus"), target("E1", "Cytosol")];
        let overlap = id_overlap(&mechanisms, &molecules, &targets);
        assert_eq!(
            overlap.chembl,
            SetOverlap {
                left_only: 1,
                shared: 1,
                right_only: 1
            }
        );
        assert_eq!(
            overlap.ensembl,
            SetOverlap {
                left_only: 1,
                shared: 1,
                right_only: 0
            }
        );
    }
}
