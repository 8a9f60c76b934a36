//! Two-sided Fisher's exact test of 2x2 tables
//!
//! The table `[[a, b], [c, d]]` is interpreted as a draw from a
//! hypergeometric distribution with
//!
//! - population `N = a + b + c + d`
//! - successes `K = a + c` (first column)
//! - draws `n = a + b` (first row)
//!
//! The two-sided p-value is the sum of the probabilities of all tables
//! with the same margins that are at most as likely as the observed one.
//! Probabilities are compared in log-space with a relative tolerance of
//! `1e-7`, so that tables with the same probability are not lost to
//! rounding errors.

use statrs::distribution::{Discrete, Hypergeometric};

/// Relative tolerance when comparing the probability of two tables
const RELATIVE_ERROR: f64 = 1.0 + 1e-7;

/// The result of Fisher's exact test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisherExact {
    odds_ratio: f64,
    pvalue: f64,
}

impl FisherExact {
    /// Returns the sample odds ratio `a * d / (b * c)`
    ///
    /// - `inf` if `b * c == 0` and `a * d > 0`
    /// - `0.0` if `a * d == 0` and `b * c > 0`
    /// - `NaN` if both are `0`
    pub fn odds_ratio(&self) -> f64 {
        self.odds_ratio
    }

    /// Returns the two-sided p-value within `[0, 1]`
    pub fn pvalue(&self) -> f64 {
        self.pvalue
    }
}

/// Calculates the two-sided Fisher's exact test of a 2x2 table
///
/// A table where any row or column sums to `0` carries no information.
/// Its p-value is `1.0` and its odds ratio `NaN`.
///
/// # Examples
///
/// ```
/// use modloc::stats::fisher::exact;
///
/// let result = exact(&[[10, 5], [2, 20]]);
/// assert!((result.pvalue() - 0.000_739_992_757).abs() < 1e-11);
/// assert!((result.odds_ratio() - 20.0).abs() < 1e-12);
///
/// let result = exact(&[[0, 0], [4, 7]]);
/// assert_eq!(result.pvalue(), 1.0);
/// assert!(result.odds_ratio().is_nan());
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn exact(table: &[[u64; 2]; 2]) -> FisherExact {
    let [[a, b], [c, d]] = *table;

    if a + b == 0 || c + d == 0 || a + c == 0 || b + d == 0 {
        return FisherExact {
            odds_ratio: f64::NAN,
            pvalue: 1.0,
        };
    }

    let numerator = a as f64 * d as f64;
    let denominator = b as f64 * c as f64;
    let odds_ratio = if denominator == 0.0 {
        if numerator == 0.0 {
            f64::NAN
        } else {
            f64::INFINITY
        }
    } else {
        numerator / denominator
    };

    FisherExact {
        odds_ratio,
        pvalue: two_sided_pvalue(a, b, c, d),
    }
}

fn two_sided_pvalue(a: u64, b: u64, c: u64, d: u64) -> f64 {
    let population = a + b + c + d;
    let successes = a + c;
    let draws = a + b;

    let hyper = Hypergeometric::new(population, successes, draws)
        .expect("margins of a table never exceed its total");

    let min = (draws + successes).saturating_sub(population);
    let max = successes.min(draws);

    let observed = hyper.ln_pmf(a) + RELATIVE_ERROR.ln();
    let pvalue: f64 = (min..=max)
        .map(|x| hyper.ln_pmf(x))
        .filter(|ln_p| *ln_p <= observed)
        .map(f64::exp)
        .sum();
    pvalue.min(1.0)
}
