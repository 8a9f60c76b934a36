//! Writing the results of an analysis
//!
//! The statistics table lists one row per pair of drug modality and location:
//!
//! ```text
//! Drug Modality   Location   P-value                 Odds Ratio   Significance
//! Antibody        Cytosol    0.0007399927572668526   0.05         True
//! Antibody        Nucleus    0.0007399927572668526   20.0         True
//! ```
//!
//! Floats are written in their shortest representation that parses back into
//! the same value, using scientific notation for very small and very large
//! numbers (`7.4e-05`). Non-finite values are written as `inf`, `-inf` and `nan`.
//!
//! The charts are rendered by [`plot`].

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::parser::tsv;
use crate::stats::Association;
use crate::ModlocResult;

pub mod plot;

/// The columns of the statistics table
pub const COLUMNS: [&str; 5] = [
    "Drug Modality",
    "Location",
    "P-value",
    "Odds Ratio",
    "Significance",
];

/// The additional column, if p-values are corrected for multiple testing
pub const ADJUSTED_COLUMN: &str = "Adjusted P-value";

/// Writes the statistics table into a new file
///
/// The `Adjusted P-value` column is added right after the `P-value` column,
/// if the associations carry adjusted p-values.
///
/// Returns the number of written rows
///
/// # Errors
///
/// [`crate::ModlocError::Io`] or [`crate::ModlocError::Csv`] if the file cannot be written
pub fn write_statistics<P: AsRef<Path>>(
    file: P,
    associations: &[Association],
    only_significant: bool,
) -> ModlocResult<usize> {
    let filename = file.as_ref().display().to_string();
    let written = write_statistics_to(
        std::fs::File::create(file)?,
        associations,
        only_significant,
    )?;
    info!("Wrote {} associations to {}", written, filename);
    Ok(written)
}

/// Writes the statistics table into any writer
///
/// # Errors
///
/// [`crate::ModlocError::Io`] or [`crate::ModlocError::Csv`] if writing fails
pub fn write_statistics_to<W: Write>(
    inner: W,
    associations: &[Association],
    only_significant: bool,
) -> ModlocResult<usize> {
    let adjusted = associations
        .iter()
        .any(|association| association.adjusted_pvalue().is_some());

    let mut wtr = tsv::writer(inner);
    let mut header: Vec<&str> = COLUMNS.to_vec();
    if adjusted {
        header.insert(3, ADJUSTED_COLUMN);
    }
    wtr.write_record(&header)?;

    let mut written = 0usize;
    for association in associations {
        if only_significant && !association.is_significant() {
            continue;
        }
        let mut row = vec![
            association.modality().to_string(),
            association.location().to_string(),
            format_float(association.pvalue()),
        ];
        if adjusted {
            row.push(
                association
                    .adjusted_pvalue()
                    .map(format_float)
                    .unwrap_or_default(),
            );
        }
        row.push(format_float(association.odds_ratio()));
        row.push(format_bool(association.is_significant()).to_string());
        wtr.write_record(&row)?;
        written += 1;
    }
    wtr.flush()?;
    debug!(
        "{} of {} associations written",
        written,
        associations.len()
    );
    Ok(written)
}

/// Formats a float in its shortest round-trip representation
///
/// # Examples
///
/// ```
/// use modloc::report::format_float;
///
/// assert_eq!(format_float(20.0), "20.0");
/// assert_eq!(format_float(0.05), "0.05");
/// assert_eq!(format_float(0.000_074), "7.4e-05");
/// assert_eq!(format_float(f64::INFINITY), "inf");
/// assert_eq!(format_float(f64::NAN), "nan");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{value:e}");
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            return format!("{mantissa}e{sign}{digits:0>2}");
        }
        return formatted;
    }

    let formatted = value.to_string();
    if formatted.contains('.') {
        formatted
    } else {
        format!("{formatted}.0")
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
