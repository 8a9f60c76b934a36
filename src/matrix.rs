//! A small row-major count matrix with row and column access
//!
//! ```text
//!    ||   0|   1|   2|
//! ===================
//! 0  ||  11|  12|  13|
//! 1  ||  21|  22|  23|
//! ```
//!
//! `Matrix` is only used internally to back the
//! [`ContingencyTable`](crate::ContingencyTable).

use std::fmt::Debug;
use std::iter::StepBy;
use std::slice::{ChunksExact, Iter};

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Creates a `rows` x `cols` matrix filled with the default value
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::default(); rows * cols],
        }
    }
}

impl<T> Matrix<T> {
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the value at `row`, `col`
    ///
    /// # Panics
    ///
    /// If `row` or `col` are out of bounds
    pub fn get(&self, row: usize, col: usize) -> &T {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        &self.data[row * self.cols + col]
    }

    /// Returns a mutable reference to the value at `row`, `col`
    ///
    /// # Panics
    ///
    /// If `row` or `col` are out of bounds
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        &mut self.data[row * self.cols + col]
    }

    /// Iterates all rows, each row is a slice of `cols` values
    pub fn rows(&self) -> ChunksExact<'_, T> {
        // `chunks_exact` panics on a chunk size of 0
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Iterates all columns, each column is an iterator of `rows` values
    pub fn cols(&self) -> ColumnIterator<'_, T> {
        ColumnIterator {
            data: &self.data,
            cols: self.cols,
            idx: 0,
        }
    }

    /// Iterates all values in row-major order
    pub fn iter(&self) -> Iter<'_, T> {
        self.data.iter()
    }
}

impl<T: std::fmt::Display> Debug for Matrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.rows() {
            let v: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
            writeln!(f, "[{}]", v.join(", "))?;
        }
        Ok(())
    }
}

pub(crate) struct ColumnIterator<'a, T> {
    data: &'a [T],
    cols: usize,
    idx: usize,
}

impl<'a, T> Iterator for ColumnIterator<'a, T> {
    type Item = StepBy<Iter<'a, T>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.cols || self.data.is_empty() {
            return None;
        }
        let col = self.data[self.idx..].iter().step_by(self.cols);
        self.idx += 1;
        Some(col)
    }
}
