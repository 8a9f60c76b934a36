//! Association of drug modalities with subcellular locations
//!
//! For every cell of a [`ContingencyTable`] the cell is compared against all
//! other observations in a 2x2 table and tested with a two-sided
//! [Fisher's exact test](`fisher::exact`):
//!
//! ```text
//!                         modality      other modalities
//! location              n(loc, mod)   n(loc) - n(loc, mod)
//! other locations  n(mod) - n(loc, mod)       rest
//! ```
//!
//! By default, every p-value stands on its own. A [`Correction`] for
//! multiple testing across all cells can be applied on request.
//!
//! # Examples
//!
//! ```
//! use modloc::{ContingencyTable, Correction};
//! use modloc::stats::associations;
//!
//! let table = ContingencyTable::from_pairs([
//!     ("Nucleus", "Antibody", 10),
//!     ("Cytosol", "Antibody", 5),
//!     ("Nucleus", "Small molecule", 2),
//!     ("Cytosol", "Small molecule", 20),
//! ]);
//!
//! let results = associations(&table, 0.05, Correction::None).unwrap();
//! assert_eq!(results.len(), 4);
//!
//! let antibody_nucleus = &results[1];
//! assert_eq!(antibody_nucleus.modality(), "Antibody");
//! assert_eq!(antibody_nucleus.location(), "Nucleus");
//! assert!((antibody_nucleus.odds_ratio() - 20.0).abs() < 1e-12);
//! assert!(antibody_nucleus.is_significant());
//! ```

use std::fmt::Display;
use std::str::FromStr;

use tracing::debug;

use crate::contingency::ContingencyTable;
use crate::{ModlocError, ModlocResult};

pub mod fisher;

/// The result of testing one pair of drug modality and location
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    modality: String,
    location: String,
    count: u64,
    pvalue: f64,
    adjusted_pvalue: Option<f64>,
    odds_ratio: f64,
    significant: bool,
}

impl Association {
    /// The drug modality (column of the contingency table)
    pub fn modality(&self) -> &str {
        &self.modality
    }

    /// The subcellular location (row of the contingency table)
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The number of observations of the pair
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the two-sided p-value of Fisher's exact test
    ///
    /// The p-value indicates the probability of a distribution at least as
    /// extreme as the observed one, given the marginal totals.
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }

    /// Returns the p-value after correcting for multiple testing
    ///
    /// `None` if no [`Correction`] was applied
    pub fn adjusted_pvalue(&self) -> Option<f64> {
        self.adjusted_pvalue
    }

    /// Returns the sample odds ratio of the 2x2 table
    pub fn odds_ratio(&self) -> f64 {
        self.odds_ratio
    }

    /// Returns `true` if the (adjusted) p-value is below the threshold
    pub fn is_significant(&self) -> bool {
        self.significant
    }
}

/// Correction of p-values for testing all cells of a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Correction {
    /// Every p-value stands alone
    #[default]
    None,
    /// Bonferroni correction, controls the family-wise error rate
    Bonferroni,
    /// Benjamini-Hochberg procedure, controls the false discovery rate
    BenjaminiHochberg,
}

impl Correction {
    /// Adjusts all `pvalues` for multiple testing
    ///
    /// Returns `None` for [`Correction::None`], otherwise the adjusted
    /// p-values in the same order as the input.
    ///
    /// # Examples
    ///
    /// ```
    /// use modloc::Correction;
    ///
    /// let pvalues = [0.01, 0.04, 0.03, 0.5];
    /// assert!(Correction::None.adjust(&pvalues).is_none());
    /// assert_eq!(
    ///     Correction::Bonferroni.adjust(&pvalues).unwrap(),
    ///     vec![0.04, 0.16, 0.12, 1.0]
    /// );
    /// ```
    pub fn adjust(&self, pvalues: &[f64]) -> Option<Vec<f64>> {
        match self {
            Correction::None => None,
            Correction::Bonferroni => {
                let n = f64_from_usize(pvalues.len());
                Some(pvalues.iter().map(|p| (p * n).min(1.0)).collect())
            }
            Correction::BenjaminiHochberg => Some(benjamini_hochberg(pvalues)),
        }
    }
}

impl FromStr for Correction {
    type Err = ModlocError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Correction::None),
            "bonferroni" => Ok(Correction::Bonferroni),
            "bh" | "fdr" | "benjamini-hochberg" => Ok(Correction::BenjaminiHochberg),
            _ => Err(ModlocError::InvalidInput(format!(
                "unknown multiple testing correction {s}"
            ))),
        }
    }
}

impl Display for Correction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Correction::None => write!(f, "none"),
            Correction::Bonferroni => write!(f, "bonferroni"),
            Correction::BenjaminiHochberg => write!(f, "bh"),
        }
    }
}

fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| pvalues[*a].total_cmp(&pvalues[*b]));

    let mut adjusted = vec![0.0; n];
    let mut running_min = 1.0f64;
    for (rank, idx) in order.iter().enumerate().rev() {
        let value = pvalues[*idx] * f64_from_usize(n) / f64_from_usize(rank + 1);
        running_min = running_min.min(value);
        adjusted[*idx] = running_min;
    }
    adjusted
}

/// Returns `true` if `pvalue` is strictly below `threshold`
pub fn is_significant(pvalue: f64, threshold: f64) -> bool {
    pvalue < threshold
}

/// Ensures the significance threshold is a probability above 0
///
/// # Errors
///
/// [`ModlocError::InvalidThreshold`] if the threshold is not within `(0, 1]`
pub fn validate_threshold(threshold: f64) -> ModlocResult<f64> {
    if threshold > 0.0 && threshold <= 1.0 {
        Ok(threshold)
    } else {
        Err(ModlocError::InvalidThreshold(threshold))
    }
}

/// Tests every pair of modality and location for association
///
/// The result is ordered by modality first, then by location, following the
/// order of the columns and rows of the table.
///
/// # Errors
///
/// [`ModlocError::InvalidThreshold`] if the threshold is not within `(0, 1]`
pub fn associations(
    table: &ContingencyTable,
    threshold: f64,
    correction: Correction,
) -> ModlocResult<Vec<Association>> {
    let threshold = validate_threshold(threshold)?;

    let mut res = Vec::with_capacity(table.rows().len() * table.cols().len());
    for (col, modality) in table.cols().iter().enumerate() {
        for (row, location) in table.rows().iter().enumerate() {
            let counts = table.two_by_two(row, col);
            let result = fisher::exact(&counts);
            debug!(
                "{}\t{}\t{:?}\tp-value: {}, odds ratio: {}",
                modality,
                location,
                counts,
                result.pvalue(),
                result.odds_ratio()
            );
            res.push(Association {
                modality: modality.clone(),
                location: location.clone(),
                count: counts[0][0],
                pvalue: result.pvalue(),
                adjusted_pvalue: None,
                odds_ratio: result.odds_ratio(),
                significant: is_significant(result.pvalue(), threshold),
            });
        }
    }

    let pvalues: Vec<f64> = res.iter().map(Association::pvalue).collect();
    if let Some(adjusted) = correction.adjust(&pvalues) {
        for (association, adjusted) in res.iter_mut().zip(adjusted) {
            association.adjusted_pvalue = Some(adjusted);
            association.significant = is_significant(adjusted, threshold);
        }
    }
    Ok(res)
}

/// Converts `usize` to `f64`
///
/// # Panics
///
/// If the value cannot be represented as `u32`
fn f64_from_usize(n: usize) -> f64 {
    let intermediate: u32 = n
        .try_into()
        .expect("cannot safely create f64 from large usize");
    intermediate.into()
}

#[cfg(test)]
mod test {
    use super::*;

    fn example() -> ContingencyTable {
        ContingencyTable::from_pairs([
            ("Nucleus", "Antibody", 10),
            ("Cytosol", "Antibody", 5),
            ("Nucleus", "Small molecule", 2),
            ("Cytosol", "Small molecule", 20),
        ])
    }

    #[test]
    fn modality_major_order() {
        let res = associations(&example(), 0.05, Correction::None).unwrap();
        let pairs: Vec<(&str, &str)> = res.iter().map(|a| (a.modality(), a.location())).collect();
        assert_eq!(
            pairs,
            vec![
                ("Antibody", "Cytosol"),
                ("Antibody", "Nucleus"),
                ("Small molecule", "Cytosol"),
                ("Small molecule", "Nucleus"),
            ]
        );
        assert_eq!(res[1].count(), 10);
        assert!(res.iter().all(|a| a.adjusted_pvalue().is_none()));
    }

    #[test]
    fn known_pvalues() {
        let res = associations(&example(), 0.05, Correction::None).unwrap();
        // every cell of a 2x2 table collapses into the same table up to symmetry
        for association in &res {
            assert!((association.pvalue() - 0.000_739_992_757_266_852_6).abs() < 1e-12);
            assert!(association.is_significant());
        }
        assert!((res[0].odds_ratio() - 0.05).abs() < 1e-12);
        assert!((res[1].odds_ratio() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn threshold_monotonicity() {
        let pvalue = 0.03;
        let thresholds = [0.001, 0.01, 0.03, 0.031, 0.05, 0.1, 1.0];
        let flags: Vec<bool> = thresholds.iter().map(|t| is_significant(pvalue, *t)).collect();
        // once significant, every larger threshold stays significant
        let first = flags.iter().position(|f| *f).unwrap();
        assert!(flags[..first].iter().all(|f| !f));
        assert!(flags[first..].iter().all(|f| *f));
        assert_eq!(first, 3);
    }

    #[test]
    fn monotonic_over_table() {
        let table = ContingencyTable::from_pairs([
            ("Nucleus", "Antibody", 3),
            ("Cytosol", "Antibody", 5),
            ("Nucleus", "Small molecule", 4),
            ("Cytosol", "Small molecule", 9),
            ("Golgi apparatus", "Protein", 2),
            ("Nucleus", "Protein", 1),
        ]);
        let strict = associations(&table, 0.01, Correction::None).unwrap();
        let loose = associations(&table, 0.5, Correction::None).unwrap();
        for (s, l) in strict.iter().zip(&loose) {
            assert_eq!(s.pvalue(), l.pvalue());
            assert!(!s.is_significant() || l.is_significant());
        }
    }

    #[test]
    fn invalid_threshold() {
        for threshold in [0.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                associations(&example(), threshold, Correction::None),
                Err(ModlocError::InvalidThreshold(_))
            ));
        }
        assert!(associations(&example(), 1.0, Correction::None).is_ok());
    }

    #[test]
    fn bonferroni() {
        let res = associations(&example(), 0.002, Correction::Bonferroni).unwrap();
        for association in &res {
            let adjusted = association.adjusted_pvalue().unwrap();
            assert!((adjusted - 4.0 * association.pvalue()).abs() < 1e-15);
            assert!(!association.is_significant());
        }
    }

    #[test]
    fn benjamini_hochberg_adjustment() {
        let adjusted = Correction::BenjaminiHochberg
            .adjust(&[0.01, 0.04, 0.03, 0.5])
            .unwrap();
        let expected = [0.04, 0.16 / 3.0, 0.16 / 3.0, 0.5];
        for (a, e) in adjusted.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{a} != {e}");
        }
    }

    #[test]
    fn empty_table() {
        let table = ContingencyTable::from_pairs([]);
        assert!(associations(&table, 0.05, Correction::BenjaminiHochberg)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn parse_correction() {
        assert_eq!("none".parse::<Correction>().unwrap(), Correction::None);
        assert_eq!("Bonferroni".parse::<Correction>().unwrap(), Correction::Bonferroni);
        assert_eq!("bh".parse::<Correction>().unwrap(), Correction::BenjaminiHochberg);
        assert!("holm".parse::<Correction>().is_err());
        assert_eq!(Correction::BenjaminiHochberg.to_string(), "bh");
    }
}
