//! Running the complete analysis from input files to report
//!
//! A [`Pipeline`] is set up from an [`Input`] and a [`Config`] and executes
//! all steps in a single, synchronous batch. Every run recomputes all
//! results from scratch.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::combine::{self, IdOverlap, JoinDiagnostics, ObservationTable};
use crate::contingency::ContingencyTable;
use crate::normalize::{mechanism, molecule, target};
use crate::parser::read_records;
use crate::report::{self, plot};
use crate::stats::{self, Association, Correction};
use crate::{ModlocError, ModlocResult, DEFAULT_MODALITY_KEY, DEFAULT_THRESHOLD};

/// File name of the normalized target table
pub const TARGETS_FILE: &str = "preprocessed_targets.tsv";
/// File name of the normalized mechanism table
pub const MECHANISMS_FILE: &str = "preprocessed_moa.tsv";
/// File name of the normalized molecule table
pub const MOLECULES_FILE: &str = "preprocessed_molecules.tsv";
/// File name of the combined observation table
pub const COMBINED_FILE: &str = "combined_data.tsv";
/// File name of the stacked bar chart
pub const STACKED_BAR_FILE: &str = "stacked_bar_distributions.svg";

/// The source of observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The three raw datasets, as JSON-lines or tab-delimited files
    Datasets {
        /// Targets with their subcellular locations
        targets: PathBuf,
        /// Mechanisms of action
        mechanisms: PathBuf,
        /// Molecules with their drug type
        molecules: PathBuf,
    },
    /// A previously combined observation table (`combined_data.tsv`)
    Combined(PathBuf),
}

/// The column used as location
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationKey {
    /// The human readable label, e.g. `Nucleus`
    #[default]
    Label,
    /// The location as reported by the source, without qualifier
    Code,
}

impl LocationKey {
    /// The name of the column in the observation table
    pub fn column(&self) -> &'static str {
        match self {
            LocationKey::Label => "subcellular_location_label",
            LocationKey::Code => "subcellular_location",
        }
    }
}

impl FromStr for LocationKey {
    type Err = ModlocError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "label" | "subcellular_location_label" => Ok(LocationKey::Label),
            "code" | "subcellular_location" => Ok(LocationKey::Code),
            _ => Err(ModlocError::InvalidInput(format!(
                "unknown location key {s}"
            ))),
        }
    }
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Settings of an analysis
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use modloc::{Config, Correction, LocationKey};
///
/// let config = Config::default()
///     .with_location_key(LocationKey::Code)
///     .with_threshold(0.01)
///     .with_correction(Correction::BenjaminiHochberg);
///
/// assert_eq!(config.modality_key(), "drugType");
/// assert_eq!(config.out_dir(), Path::new("./drugType_analysis"));
/// assert_eq!(config.threshold(), 0.01);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    modality_key: String,
    location_key: LocationKey,
    save_intermediate: bool,
    out_dir: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
    threshold: f64,
    only_significant: bool,
    correction: Correction,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modality_key: DEFAULT_MODALITY_KEY.to_string(),
            location_key: LocationKey::default(),
            save_intermediate: false,
            out_dir: None,
            scratch_dir: None,
            threshold: DEFAULT_THRESHOLD,
            only_significant: false,
            correction: Correction::default(),
        }
    }
}

impl Config {
    /// Sets the column used as drug modality
    #[must_use]
    pub fn with_modality_key<S: Into<String>>(mut self, key: S) -> Self {
        self.modality_key = key.into();
        self
    }

    /// Sets the column used as location
    #[must_use]
    pub fn with_location_key(mut self, key: LocationKey) -> Self {
        self.location_key = key;
        self
    }

    /// Keeps the normalized tables in the output directory
    #[must_use]
    pub fn with_save_intermediate(mut self, save: bool) -> Self {
        self.save_intermediate = save;
        self
    }

    /// Sets the output directory
    #[must_use]
    pub fn with_out_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// Sets the directory for intermediate files
    ///
    /// The directory must not be used by another run at the same time.
    #[must_use]
    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Sets the p-value threshold for significance
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Reports only significant associations
    #[must_use]
    pub fn with_only_significant(mut self, only_significant: bool) -> Self {
        self.only_significant = only_significant;
        self
    }

    /// Sets the correction for multiple testing
    #[must_use]
    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.correction = correction;
        self
    }

    /// The column used as drug modality
    pub fn modality_key(&self) -> &str {
        &self.modality_key
    }

    /// The column used as location
    pub fn location_key(&self) -> LocationKey {
        self.location_key
    }

    /// Returns `true` if the normalized tables are kept
    pub fn save_intermediate(&self) -> bool {
        self.save_intermediate
    }

    /// The output directory, `./{modality_key}_analysis` by default
    pub fn out_dir(&self) -> PathBuf {
        self.out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("./{}_analysis", self.modality_key)))
    }

    /// The directory for intermediate files, if one is set
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// The p-value threshold for significance
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns `true` if only significant associations are reported
    pub fn only_significant(&self) -> bool {
        self.only_significant
    }

    /// The correction for multiple testing
    pub fn correction(&self) -> Correction {
        self.correction
    }
}

/// A directory for intermediate files that is cleaned up when dropped
///
/// Without an explicit path, a new temporary directory is created. An explicit
/// path is created if needed and removed on drop if it did not exist before.
/// If it did exist, only the files handed out by [`ScratchDir::file`] are removed.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    temp: Option<TempDir>,
    created: bool,
    files: Vec<PathBuf>,
}

impl ScratchDir {
    /// Acquires a scratch directory
    ///
    /// # Errors
    ///
    /// [`ModlocError::Io`] if the directory cannot be created
    pub fn acquire(dir: Option<&Path>) -> ModlocResult<Self> {
        let res = match dir {
            Some(path) => {
                let created = !path.exists();
                fs::create_dir_all(path)?;
                Self {
                    path: path.to_path_buf(),
                    temp: None,
                    created,
                    files: Vec::new(),
                }
            }
            None => {
                let temp = tempfile::Builder::new().prefix("modloc_").tempdir()?;
                Self {
                    path: temp.path().to_path_buf(),
                    temp: Some(temp),
                    created: true,
                    files: Vec::new(),
                }
            }
        };
        debug!("Using scratch directory {}", res.path.display());
        Ok(res)
    }

    /// The path of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of a file inside the directory
    pub fn file(&mut self, name: &str) -> PathBuf {
        let path = self.path.join(name);
        self.files.push(path.clone());
        path
    }

    /// Keeps a file of the directory when it is dropped
    pub fn keep(&mut self, file: &Path) {
        self.files.retain(|tracked| tracked != file);
    }

    /// Returns `true` if `dir` resolves to this directory
    pub fn same_dir(&self, dir: &Path) -> bool {
        match (fs::canonicalize(&self.path), fs::canonicalize(dir)) {
            (Ok(own), Ok(other)) => own == other,
            _ => false,
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            if let Err(err) = temp.close() {
                warn!("Unable to remove scratch directory {}: {}", self.path.display(), err);
            }
            return;
        }
        let res = if self.created {
            fs::remove_dir_all(&self.path)
        } else {
            self.files
                .iter()
                .filter(|file| file.exists())
                .try_for_each(fs::remove_file)
        };
        match res {
            Ok(()) => debug!("Removed scratch files in {}", self.path.display()),
            Err(err) => warn!("Unable to clean up {}: {}", self.path.display(), err),
        }
    }
}

/// The files written by a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    /// The normalized tables, if they were kept
    pub intermediate: Vec<PathBuf>,
    /// The combined observation table, if it was computed
    pub combined: Option<PathBuf>,
    /// The statistics table
    pub statistics: PathBuf,
    /// The heatmap of the contingency table
    pub heatmap: PathBuf,
    /// The stacked bar chart of modalities per location
    pub stacked_bar: PathBuf,
}

/// The results of a run
#[derive(Debug, Clone)]
pub struct Analysis {
    observations: ObservationTable,
    contingency: ContingencyTable,
    associations: Vec<Association>,
    diagnostics: Option<JoinDiagnostics>,
    id_overlap: Option<IdOverlap>,
    outputs: Outputs,
}

impl Analysis {
    /// The combined observation table
    pub fn observations(&self) -> &ObservationTable {
        &self.observations
    }

    /// The cross-tabulation of locations and modalities
    pub fn contingency(&self) -> &ContingencyTable {
        &self.contingency
    }

    /// All tested pairs of modality and location, including non-significant ones
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// The rows lost in the joins, `None` for a pre-combined input
    pub fn diagnostics(&self) -> Option<&JoinDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// The overlap of the identifiers, `None` for a pre-combined input
    pub fn id_overlap(&self) -> Option<&IdOverlap> {
        self.id_overlap.as_ref()
    }

    /// The written files
    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Analysis of drug modalities across subcellular locations
///
/// ```mermaid
/// flowchart LR
///     T[targets] --> NT(normalize targets)
///     M[mechanisms] --> NM(normalize mechanisms)
///     D[molecules] --> ND(normalize molecules)
///     NM --> C(combine)
///     ND --> C
///     NT --> C
///     F[combined file] --> X
///     C --> X(contingency table)
///     X --> S(Fisher's exact test)
///     S --> R[significance table]
///     X --> H[heatmap]
///     X --> B[stacked bar chart]
/// ```
///
/// Normalized tables are written into a scratch directory that only lives
/// for the duration of [`Pipeline::run`].
///
/// # Examples
///
/// ```no_run
/// use modloc::{Config, Input, Pipeline};
///
/// let input = Input::Datasets {
///     targets: "targets.jsonl".into(),
///     mechanisms: "moa.jsonl".into(),
///     molecules: "molecules.jsonl".into(),
/// };
/// let pipeline = Pipeline::new(input, Config::default().with_out_dir("results")).unwrap();
/// let analysis = pipeline.run().unwrap();
///
/// for association in analysis.associations().iter().filter(|a| a.is_significant()) {
///     println!("{}\t{}\t{}", association.modality(), association.location(), association.pvalue());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    input: Input,
    config: Config,
}

impl Pipeline {
    /// Constructs a new `Pipeline`
    ///
    /// # Errors
    ///
    /// - [`ModlocError::InvalidThreshold`] if the threshold is not within `(0, 1]`
    /// - [`ModlocError::InvalidInput`] if the modality key is empty
    pub fn new(input: Input, config: Config) -> ModlocResult<Self> {
        stats::validate_threshold(config.threshold())?;
        if config.modality_key().is_empty() {
            return Err(ModlocError::InvalidInput(
                "the modality key must not be empty".to_string(),
            ));
        }
        Ok(Self { input, config })
    }

    /// The settings of the pipeline
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the analysis and writes all output files
    ///
    /// # Errors
    ///
    /// Returns the first error of any step, see [`ModlocError`]
    pub fn run(&self) -> ModlocResult<Analysis> {
        let out_dir = self.config.out_dir();
        fs::create_dir_all(&out_dir)?;
        let mut outputs = Outputs::default();

        let (observations, diagnostics, id_overlap) = match &self.input {
            Input::Combined(file) => (ObservationTable::from_tsv(file)?, None, None),
            Input::Datasets {
                targets,
                mechanisms,
                molecules,
            } => {
                let (observations, diagnostics, overlap) =
                    self.preprocess(targets, mechanisms, molecules, &out_dir, &mut outputs)?;
                let combined = out_dir.join(COMBINED_FILE);
                observations.write_tsv(&combined)?;
                info!("Wrote combined table to {}", combined.display());
                outputs.combined = Some(combined);
                (observations, Some(diagnostics), Some(overlap))
            }
        };

        let location_key = self.config.location_key().column();
        let modality_key = self.config.modality_key();
        let contingency =
            ContingencyTable::from_observations(&observations, location_key, modality_key)?;
        let associations = stats::associations(
            &contingency,
            self.config.threshold(),
            self.config.correction(),
        )?;

        outputs.statistics = out_dir.join(format!("{modality_key}_{location_key}_significance.tsv"));
        report::write_statistics(
            &outputs.statistics,
            &associations,
            self.config.only_significant(),
        )?;

        outputs.heatmap = out_dir.join(format!("{modality_key}_{location_key}_heatmap.svg"));
        plot::heatmap(&outputs.heatmap, &contingency, modality_key)?;

        outputs.stacked_bar = out_dir.join(STACKED_BAR_FILE);
        plot::stacked_bar(&outputs.stacked_bar, &contingency, modality_key)?;

        Ok(Analysis {
            observations,
            contingency,
            associations,
            diagnostics,
            id_overlap,
            outputs,
        })
    }

    /// Normalizes and combines the three datasets
    ///
    /// The scratch directory is removed when this method returns, on success
    /// and on error alike.
    fn preprocess(
        &self,
        targets: &Path,
        mechanisms: &Path,
        molecules: &Path,
        out_dir: &Path,
        outputs: &mut Outputs,
    ) -> ModlocResult<(ObservationTable, JoinDiagnostics, IdOverlap)> {
        let mut scratch = ScratchDir::acquire(self.config.scratch_dir())?;

        let target_locations = target::normalize(&read_records(targets)?)?;
        target::write_tsv(scratch.file(TARGETS_FILE), &target_locations)?;

        let edges = mechanism::normalize(&read_records(mechanisms)?)?;
        mechanism::write_tsv(scratch.file(MECHANISMS_FILE), &edges)?;

        let drugs = molecule::normalize(&read_records(molecules)?)?;
        molecule::write_tsv(scratch.file(MOLECULES_FILE), &drugs)?;

        let overlap = combine::id_overlap(&edges, &drugs, &target_locations);
        let (observations, diagnostics) = combine::combine(&edges, &drugs, &target_locations);

        if self.config.save_intermediate() {
            let in_place = scratch.same_dir(out_dir);
            for name in [TARGETS_FILE, MECHANISMS_FILE, MOLECULES_FILE] {
                let source = scratch.path().join(name);
                let destination = out_dir.join(name);
                if in_place {
                    scratch.keep(&source);
                } else {
                    fs::copy(&source, &destination)?;
                }
                debug!("Saved {}", destination.display());
                outputs.intermediate.push(destination);
            }
        }
        Ok((observations, diagnostics, overlap))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn location_keys() {
        assert_eq!("label".parse::<LocationKey>().unwrap(), LocationKey::Label);
        assert_eq!(
            "subcellular_location".parse::<LocationKey>().unwrap(),
            LocationKey::Code
        );
        assert!("compartment".parse::<LocationKey>().is_err());
        assert_eq!(LocationKey::default().to_string(), "subcellular_location_label");
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.modality_key(), DEFAULT_MODALITY_KEY);
        assert_eq!(config.location_key(), LocationKey::Label);
        assert_eq!(config.threshold(), DEFAULT_THRESHOLD);
        assert_eq!(config.correction(), Correction::None);
        assert!(!config.save_intermediate());
        assert!(!config.only_significant());
        assert!(config.scratch_dir().is_none());

        let config = config.with_modality_key("moa");
        assert_eq!(config.out_dir(), PathBuf::from("./moa_analysis"));
        let config = config.with_out_dir("/data/results");
        assert_eq!(config.out_dir(), PathBuf::from("/data/results"));
    }

    #[test]
    fn invalid_settings() {
        let input = Input::Combined("combined.tsv".into());
        assert!(matches!(
            Pipeline::new(input.clone(), Config::default().with_threshold(0.0)),
            Err(ModlocError::InvalidThreshold(_))
        ));
        assert!(matches!(
            Pipeline::new(input.clone(), Config::default().with_modality_key("")),
            Err(ModlocError::InvalidInput(_))
        ));
        assert!(Pipeline::new(input, Config::default()).is_ok());
    }

    #[test]
    fn temporary_scratch_dir_is_removed() {
        let path = {
            let mut scratch = ScratchDir::acquire(None).unwrap();
            let file = scratch.file("table.tsv");
            fs::write(&file, "a\tb\n").unwrap();
            assert!(file.exists());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn explicit_scratch_dir_is_removed() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("scratch");
        {
            let mut scratch = ScratchDir::acquire(Some(&dir)).unwrap();
            fs::write(scratch.file("table.tsv"), "a\n").unwrap();
            assert!(dir.exists());
        }
        assert!(!dir.exists());
    }

    #[test]
    fn existing_scratch_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("keep.txt");
        fs::write(&other, "data").unwrap();
        {
            let mut scratch = ScratchDir::acquire(Some(dir.path())).unwrap();
            fs::write(scratch.file("table.tsv"), "a\n").unwrap();
        }
        assert!(dir.path().exists());
        assert!(other.exists());
        assert!(!dir.path().join("table.tsv").exists());
    }

    #[test]
    fn kept_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        let kept = {
            let mut scratch = ScratchDir::acquire(Some(dir.path())).unwrap();
            assert!(scratch.same_dir(dir.path()));
            let kept = scratch.file("kept.tsv");
            fs::write(&kept, "a\n").unwrap();
            fs::write(scratch.file("table.tsv"), "a\n").unwrap();
            scratch.keep(&kept);
            kept
        };
        assert!(kept.exists());
        assert!(!dir.path().join("table.tsv").exists());
    }

    #[test]
    fn scratch_dir_is_removed_on_error() {
        let parent = tempfile::tempdir().unwrap();
        let scratch = parent.path().join("scratch");
        let input = Input::Datasets {
            targets: parent.path().join("missing_targets.jsonl"),
            mechanisms: parent.path().join("missing_moa.jsonl"),
            molecules: parent.path().join("missing_molecules.jsonl"),
        };
        let config = Config::default()
            .with_out_dir(parent.path().join("out"))
            .with_scratch_dir(&scratch);
        let res = Pipeline::new(input, config).unwrap().run();
        assert!(matches!(res, Err(ModlocError::CannotOpenFile(_))));
        assert!(!scratch.exists());
    }
}
