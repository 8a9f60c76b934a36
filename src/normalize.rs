//! Normalizers for the three input datasets
//!
//! Each normalizer takes the flat [`Record`](crate::parser::Record)s of one dataset and
//! reduces them to the few columns needed to link drugs to the location of
//! their targets:
//!
//! - [`target`]: one [`TargetLocation`] per target and subcellular location
//! - [`mechanism`]: one [`MechanismEdge`] per chemical id and target id
//! - [`molecule`]: one [`Molecule`] per chemical id with its drug type
//!
//! The identifier spaces of the datasets are kept apart by [`ChemblId`]
//! and [`EnsemblId`].

use std::fmt::Display;

use serde_json::Value;
use smallvec::SmallVec;

use crate::parser::scalar_text;
use crate::{ModlocError, ModlocResult};

pub mod mechanism;
pub mod molecule;
pub mod target;

pub use mechanism::MechanismEdge;
pub use molecule::Molecule;
pub use target::TargetLocation;

/// The elements of one list-like field after expansion
///
/// Most mechanisms list a handful of chemical ids and targets,
/// so they stay on the stack.
pub(crate) type Expanded = SmallVec<[Option<Value>; 4]>;

/// A ChEMBL identifier of a molecule, e.g. `CHEMBL1201583`
#[derive(Clone, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct ChemblId {
    inner: String,
}

impl ChemblId {
    /// Returns the identifier as `str`
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl From<&str> for ChemblId {
    fn from(value: &str) -> Self {
        Self {
            inner: value.to_string(),
        }
    }
}

impl From<String> for ChemblId {
    fn from(inner: String) -> Self {
        Self { inner }
    }
}

impl Display for ChemblId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// An Ensembl gene identifier of a target, e.g. `ENSG00000146648`
#[derive(Clone, Default, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct EnsemblId {
    inner: String,
}

impl EnsemblId {
    /// Returns the identifier as `str`
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl From<&str> for EnsemblId {
    fn from(value: &str) -> Self {
        Self {
            inner: value.to_string(),
        }
    }
}

impl From<String> for EnsemblId {
    fn from(inner: String) -> Self {
        Self { inner }
    }
}

impl Display for EnsemblId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Expands a list-like value into its elements
///
/// A missing or empty list expands into a single `None`,
/// null elements are expanded into `None` as well.
pub(crate) fn explode(values: Option<Vec<Value>>) -> Expanded {
    match values {
        Some(values) if !values.is_empty() => values
            .into_iter()
            .map(|value| match value {
                Value::Null => None,
                value => Some(value),
            })
            .collect(),
        _ => smallvec::smallvec![None],
    }
}

/// Converts one element of an id list into text
///
/// # Errors
///
/// [`ModlocError::InvalidInput`] if the element is a list or object
pub(crate) fn identifier(value: &Value, field: &str) -> ModlocResult<Option<String>> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(ModlocError::InvalidInput(format!(
            "{field} must only contain scalar identifiers, found {value}"
        ))),
        value => Ok(scalar_text(value)),
    }
}
