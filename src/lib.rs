#![doc = include_str!("../README.md")]
use core::fmt::Debug;
use thiserror::Error;

pub mod combine;
pub mod contingency;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod stats;
mod matrix;

pub use combine::{JoinDiagnostics, ObservationTable};
pub use contingency::ContingencyTable;
pub use normalize::{ChemblId, EnsemblId};
pub use pipeline::{Analysis, Config, Input, LocationKey, Pipeline};
pub use stats::{Association, Correction};

/// The column used as drug modality if nothing else is specified
pub const DEFAULT_MODALITY_KEY: &str = "drugType";

/// The p-value below which an association is reported as significant
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// Main Error type for this crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ModlocError {
    /// A file could not be opened
    #[error("unable to open file {0}")]
    CannotOpenFile(String),
    /// A record or line of an input file is structurally invalid
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A list-like field could not be parsed into a list or object
    #[error("malformed list-like value ({reason}): {value}")]
    MalformedLiteral {
        /// The raw value, exactly as it appeared in the input
        value: String,
        /// What went wrong during parsing
        reason: String,
    },
    /// A requested column is not part of the table
    #[error("column does not exist: {0}")]
    UnknownColumn(String),
    /// The significance threshold must be within `(0, 1]`
    #[error("invalid significance threshold {0}")]
    InvalidThreshold(f64),
    /// Reading or writing a delimited file failed
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Rendering a chart failed
    #[error("unable to render chart: {0}")]
    Plot(String),
    /// Any other I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shortcut for `Result<T, ModlocError>`
pub type ModlocResult<T> = Result<T, ModlocError>;
