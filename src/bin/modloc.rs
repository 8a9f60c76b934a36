//! Tests the association of drug modalities with the subcellular location
//! of their targets.
//!
//! ```shell
//! cargo run --release --bin=modloc --features=binaries -- \
//!     --targets targets.jsonl --mechanisms moa.jsonl --molecules molecules.jsonl
//! ```
//!
//! A previously combined table can be analysed again with other settings:
//!
//! ```shell
//! modloc --combined drugType_analysis/combined_data.tsv --location-key code
//! ```

use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use modloc::Config;
use modloc::Correction;
use modloc::Input;
use modloc::LocationKey;
use modloc::Pipeline;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

/// Association of drug modalities with subcellular locations.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Targets with their subcellular locations (JSON lines or TSV).
    #[arg(long, requires_all = ["mechanisms", "molecules"], conflicts_with = "combined")]
    targets: Option<PathBuf>,

    /// Mechanisms of action (JSON lines or TSV).
    #[arg(long, requires_all = ["targets", "molecules"])]
    mechanisms: Option<PathBuf>,

    /// Molecules with their drug type (JSON lines or TSV).
    #[arg(long, requires_all = ["targets", "mechanisms"])]
    molecules: Option<PathBuf>,

    /// A combined observation table, replaces the three datasets.
    #[arg(long)]
    combined: Option<PathBuf>,

    /// The column holding the drug modality.
    #[arg(long, default_value = modloc::DEFAULT_MODALITY_KEY)]
    modality_key: String,

    /// The location column: `label` or `code`.
    #[arg(long, default_value_t = LocationKey::Label)]
    location_key: LocationKey,

    /// Keeps the normalized tables in the output directory.
    #[arg(long, default_value_t = false)]
    save_intermediate: bool,

    /// The output directory (default `./{modality_key}_analysis`).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// A directory for intermediate files, removed after the run.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// The p-value below which an association is significant.
    #[arg(short, long, default_value_t = modloc::DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Reports only significant associations.
    #[arg(long, default_value_t = false)]
    only_significant: bool,

    /// Correction for multiple testing: `none`, `bonferroni` or `bh`.
    #[arg(long, default_value_t = Correction::None)]
    correction: Correction,

    #[command(flatten)]
    verbose: Verbosity,
}

impl Args {
    fn input(&self) -> Result<Input> {
        if let Some(combined) = &self.combined {
            return Ok(Input::Combined(combined.clone()));
        }
        match (&self.targets, &self.mechanisms, &self.molecules) {
            (Some(targets), Some(mechanisms), Some(molecules)) => Ok(Input::Datasets {
                targets: targets.clone(),
                mechanisms: mechanisms.clone(),
                molecules: molecules.clone(),
            }),
            _ => bail!("either --combined or all of --targets, --mechanisms and --molecules are required"),
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_modality_key(self.modality_key.clone())
            .with_location_key(self.location_key)
            .with_save_intermediate(self.save_intermediate)
            .with_threshold(self.threshold)
            .with_only_significant(self.only_significant)
            .with_correction(self.correction);
        if let Some(dir) = &self.out_dir {
            config = config.with_out_dir(dir);
        }
        if let Some(dir) = &self.scratch_dir {
            config = config.with_scratch_dir(dir);
        }
        config
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    let pipeline = Pipeline::new(args.input()?, args.config()).context("invalid settings")?;
    let analysis = pipeline.run().context("analysis failed")?;

    let significant = analysis
        .associations()
        .iter()
        .filter(|association| association.is_significant())
        .count();
    info!(
        "{} observations, {} of {} associations significant",
        analysis.observations().len(),
        significant,
        analysis.associations().len()
    );
    info!(
        "Results written to {}",
        analysis.outputs().statistics.display()
    );
    Ok(())
}
