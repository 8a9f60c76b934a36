//! Cross-tabulation of subcellular locations and drug modalities
//!
//! ```text
//!                      | Antibody | Protein | Small molecule |
//! Cytosol              |        0 |       1 |             14 |
//! Nucleus              |        3 |       0 |             22 |
//! Plasma membrane      |       41 |       6 |             30 |
//! ```
//!
//! Rows are locations, columns are modalities. Both are sorted and contain
//! exactly the values present in the observation table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::combine::ObservationTable;
use crate::matrix::Matrix;
use crate::ModlocResult;

/// A count matrix of observations per location (row) and modality (column)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContingencyTable {
    rows: Vec<String>,
    cols: Vec<String>,
    counts: Matrix<u64>,
}

impl ContingencyTable {
    /// Builds the cross-tabulation of two columns of the observation table
    ///
    /// Observations where either column is missing are not counted.
    ///
    /// # Errors
    ///
    /// [`crate::ModlocError::UnknownColumn`] if one of the columns is not part of the table
    pub fn from_observations(
        table: &ObservationTable,
        row_key: &str,
        col_key: &str,
    ) -> ModlocResult<Self> {
        let mut pairs: BTreeMap<(&str, &str), u64> = BTreeMap::new();
        for (row, col) in table.column(row_key)?.zip(table.column(col_key)?) {
            if let (Some(row), Some(col)) = (row, col) {
                *pairs.entry((row, col)).or_default() += 1;
            }
        }
        let res = Self::from_pairs(pairs.into_iter().map(|((row, col), count)| (row, col, count)));
        debug!(
            "Contingency table of {} x {} with {} observations",
            res.rows.len(),
            res.cols.len(),
            res.total()
        );
        if res.is_empty() {
            warn!("No observation has both {} and {}", row_key, col_key);
        }
        Ok(res)
    }

    /// Builds a table from `(row, column, count)` triples
    ///
    /// Counts of repeated pairs are added up.
    ///
    /// # Examples
    ///
    /// ```
    /// use modloc::ContingencyTable;
    ///
    /// let table = ContingencyTable::from_pairs([
    ///     ("Nucleus", "Antibody", 10),
    ///     ("Cytosol", "Antibody", 5),
    ///     ("Nucleus", "Small molecule", 2),
    ///     ("Cytosol", "Small molecule", 20),
    /// ]);
    /// assert_eq!(table.rows(), ["Cytosol", "Nucleus"]);
    /// assert_eq!(table.count(1, 0), 10);
    /// assert_eq!(table.total(), 37);
    /// ```
    pub fn from_pairs<'a, I: IntoIterator<Item = (&'a str, &'a str, u64)>>(pairs: I) -> Self {
        let pairs: Vec<(&str, &str, u64)> = pairs.into_iter().collect();
        let rows: Vec<String> = pairs
            .iter()
            .map(|(row, _, _)| *row)
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let cols: Vec<String> = pairs
            .iter()
            .map(|(_, col, _)| *col)
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut counts = Matrix::new(rows.len(), cols.len());
        for (row, col, count) in pairs {
            let row_idx = rows
                .binary_search_by(|r| r.as_str().cmp(row))
                .expect("row labels are built from the pairs");
            let col_idx = cols
                .binary_search_by(|c| c.as_str().cmp(col))
                .expect("column labels are built from the pairs");
            *counts.get_mut(row_idx, col_idx) += count;
        }
        Self { rows, cols, counts }
    }

    /// The row labels (locations)
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// The column labels (modalities)
    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    /// Returns the number of rows and columns
    pub fn dim(&self) -> (usize, usize) {
        self.counts.dim()
    }

    /// Returns `true` if the table does not contain any cell
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The count of observations in `row`, `col`
    ///
    /// # Panics
    ///
    /// If `row` or `col` are out of bounds
    pub fn count(&self, row: usize, col: usize) -> u64 {
        *self.counts.get(row, col)
    }

    /// The total number of observations of every row
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.rows().map(|row| row.iter().sum()).collect()
    }

    /// The total number of observations of every column
    pub fn col_totals(&self) -> Vec<u64> {
        self.counts.cols().map(|col| col.sum()).collect()
    }

    /// The total number of observations
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates all rows as slices of counts
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u64]> {
        self.counts.rows()
    }

    /// Collapses the table into a 2x2 table of one cell against everything else
    ///
    /// ```text
    /// [[ n(row, col),               col total - n(row, col) ],
    ///  [ row total - n(row, col),   remaining observations  ]]
    /// ```
    ///
    /// # Panics
    ///
    /// If `row` or `col` are out of bounds
    pub fn two_by_two(&self, row: usize, col: usize) -> [[u64; 2]; 2] {
        let cell = self.count(row, col);
        let row_rest = self.counts.rows().nth(row).map_or(0, |r| r.iter().sum::<u64>()) - cell;
        let col_rest = self.counts.cols().nth(col).map_or(0, |c| c.sum::<u64>()) - cell;
        let rest = self.total() - cell - row_rest - col_rest;
        [[cell, col_rest], [row_rest, rest]]
    }

    /// The share of every cell in its row, in percent
    ///
    /// Rows without observations contain only `0.0`
    pub fn row_percentages(&self) -> Vec<Vec<f64>> {
        self.counts
            .rows()
            .map(|row| {
                let total: u64 = row.iter().sum();
                row.iter().map(|count| percentage(*count, total)).collect()
            })
            .collect()
    }

    /// The share of every cell in its column, in percent
    ///
    /// The result is row-major, just like the table itself.
    pub fn column_percentages(&self) -> Vec<Vec<f64>> {
        let totals = self.col_totals();
        self.counts
            .rows()
            .map(|row| {
                row.iter()
                    .zip(&totals)
                    .map(|(count, total)| percentage(*count, *total))
                    .collect()
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn observations(rows: &[(&str, Option<&str>)]) -> ObservationTable {
        ObservationTable::new(
            vec!["location".to_string(), "modality".to_string()],
            rows.iter()
                .map(|(loc, modality)| vec![Some(loc.to_string()), modality.map(str::to_string)])
                .collect(),
        )
        .unwrap()
    }

    fn example() -> ContingencyTable {
        ContingencyTable::from_pairs([
            ("Nucleus", "Antibody", 10),
            ("Cytosol", "Antibody", 5),
            ("Nucleus", "Small molecule", 2),
            ("Cytosol", "Small molecule", 20),
        ])
    }

    #[test]
    fn cross_tab() {
        let table = observations(&[
            ("Nucleus", Some("Antibody")),
            ("Nucleus", Some("Antibody")),
            ("Cytosol", Some("Protein")),
            ("Nucleus", Some("Protein")),
            ("Golgi apparatus", None),
        ]);
        let ct = ContingencyTable::from_observations(&table, "location", "modality").unwrap();
        assert_eq!(ct.rows(), ["Cytosol", "Nucleus"]);
        assert_eq!(ct.cols(), ["Antibody", "Protein"]);
        assert_eq!(ct.count(0, 0), 0);
        assert_eq!(ct.count(0, 1), 1);
        assert_eq!(ct.count(1, 0), 2);
        assert_eq!(ct.count(1, 1), 1);
    }

    #[test]
    fn cell_sum_equals_observations() {
        let table = observations(&[
            ("A", Some("x")),
            ("B", Some("y")),
            ("A", Some("y")),
            ("C", Some("x")),
            ("A", Some("x")),
        ]);
        let ct = ContingencyTable::from_observations(&table, "location", "modality").unwrap();
        assert_eq!(ct.total(), table.len() as u64);
        assert_eq!(ct.row_totals().iter().sum::<u64>(), 5);
        assert_eq!(ct.col_totals().iter().sum::<u64>(), 5);
    }

    #[test]
    fn unknown_key() {
        let table = observations(&[("A", Some("x"))]);
        assert!(ContingencyTable::from_observations(&table, "location", "drugType").is_err());
    }

    #[test]
    fn totals() {
        let ct = example();
        assert_eq!(ct.row_totals(), vec![25, 12]);
        assert_eq!(ct.col_totals(), vec![15, 22]);
        assert_eq!(ct.total(), 37);
    }

    #[test]
    fn collapse_to_two_by_two() {
        let ct = example();
        // Nucleus x Antibody
        assert_eq!(ct.two_by_two(1, 0), [[10, 5], [2, 20]]);
        // Cytosol x Small molecule
        assert_eq!(ct.two_by_two(0, 1), [[20, 2], [5, 10]]);
        for row in 0..2 {
            for col in 0..2 {
                let t = ct.two_by_two(row, col);
                assert_eq!(t[0][0] + t[0][1] + t[1][0] + t[1][1], ct.total());
            }
        }
    }

    #[test]
    fn percentages() {
        let ct = example();
        let by_row = ct.row_percentages();
        assert!((by_row[0][0] - 20.0).abs() < 1e-12);
        assert!((by_row[0][1] - 80.0).abs() < 1e-12);
        assert!(by_row.iter().all(|row| (row.iter().sum::<f64>() - 100.0).abs() < 1e-9));

        let by_col = ct.column_percentages();
        assert!((by_col[1][0] - 200.0 / 3.0).abs() < 1e-12);
        assert!(((by_col[0][1] + by_col[1][1]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_table() {
        let table = observations(&[("A", None)]);
        let ct = ContingencyTable::from_observations(&table, "location", "modality").unwrap();
        assert!(ct.is_empty());
        assert_eq!(ct.total(), 0);
        assert!(ct.row_percentages().is_empty());
    }
}
