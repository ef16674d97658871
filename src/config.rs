//! Command line configuration and pre-flight validation

use crate::ebetac::{BiasMode, FesFiles};
use crate::errors::*;
use crate::grid::{cell_count, DEFAULT_BINS};
use crate::reweight::MAX_DIMENSION;
use crate::table::ColumnSelector;
use clap::Parser;
use std::path::{Path, PathBuf};

const ABOUT: &str = "\
Time-independent free energy reconstruction from metadynamics, following the reweighting
scheme of Tiwary and Parrinello, JPCB 2014.

Typical uses:
 1) project a metadynamics FES on CVs that were not biased during the run
 2) estimate the error of FE profiles by comparing them with profiles obtained by
    integrating the bias, e.g. with plumed sum_hills

Example:

  metad-reweight -y 5.0 --kt 2.5 -f fes2d- --num-fes 80 --fes-col 3 \\
                 -c COLVAR --colvar-bias-col 4 --colvar-rew-col 2 3

reads fes2d-0.dat ... fes2d-79.dat from a well-tempered run with bias factor 5, free
energy in the 3rd column, and projects the FES on COLVAR columns 2 and 3 using the bias
in column 4.

Column selectors are 1-based column numbers or names from a `#! FIELDS` header.";

/// Settings for a reweighting run
#[derive(Parser, Debug, Clone)]
#[command(name = "metad-reweight", version, about = ABOUT)]
pub struct Settings {
    /// FES filename prefix as generated with plumed sum_hills --stride; expects PREFIX%d.dat
    #[arg(
        short = 'f',
        long = "fes",
        value_name = "PREFIX",
        required_unless_present = "exp_bct_file",
        help_heading = "Input Options"
    )]
    pub fes_prefix: Option<String>,

    /// File containing original CVs, reweighting CVs and metadynamics bias
    #[arg(short, long, default_value = "COLVAR", help_heading = "Input Options")]
    pub colvar: PathBuf,

    /// Bias factor of the well-tempered metadynamics; omit for standard metadynamics
    #[arg(
        short = 'y',
        long,
        allow_negative_numbers = true,
        help_heading = "Input Options"
    )]
    pub bias_factor: Option<f64>,

    /// kT in the energy units of the FES files
    #[arg(
        long = "kt",
        default_value_t = 2.49,
        allow_negative_numbers = true,
        help_heading = "Input Options"
    )]
    pub kt: f64,

    /// Precalculated ebetac list; if omitted it is computed from the FES files
    #[arg(long, value_name = "FILE", help_heading = "Input Options")]
    pub exp_bct_file: Option<PathBuf>,

    /// Output FES filename
    #[arg(
        short,
        long,
        default_value = "fes_rew.dat",
        help_heading = "Output Options"
    )]
    pub outfile: PathBuf,

    /// Save the ebetac list into this file
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub exp_bct_out: Option<PathBuf>,

    /// Minimum values of the reweighting CVs; found from the COLVAR file if omitted
    #[arg(
        long,
        num_args = 1..,
        allow_negative_numbers = true,
        help_heading = "Extra Data Options"
    )]
    pub cv_mins: Option<Vec<f64>>,

    /// Maximum values of the reweighting CVs; found from the COLVAR file if omitted
    #[arg(
        long,
        num_args = 1..,
        allow_negative_numbers = true,
        help_heading = "Extra Data Options"
    )]
    pub cv_maxs: Option<Vec<f64>>,

    /// Number of grid points for the reweighted FES, one per CV [default: 100 for each CV]
    #[arg(long, num_args = 1.., help_heading = "Extra Data Options")]
    pub bins: Option<Vec<usize>>,

    /// Be verbose
    #[arg(short, long, help_heading = "Extra Data Options")]
    pub verbose: bool,

    /// Number of FES input files
    #[arg(long, default_value_t = 100, help_heading = "Column Options")]
    pub num_fes: usize,

    /// Free energy column in the FES input files
    #[arg(long, default_value = "2", help_heading = "Column Options")]
    pub fes_col: ColumnSelector,

    /// Column(s) in the COLVAR file containing the CVs to be reweighted
    #[arg(long, num_args = 1.., default_values = ["2"], help_heading = "Column Options")]
    pub colvar_rew_col: Vec<ColumnSelector>,

    /// Column(s) in the COLVAR file containing any energy bias (metadynamics bias, walls,
    /// external potentials..)
    #[arg(long, num_args = 1.., default_values = ["4"], help_heading = "Column Options")]
    pub colvar_bias_col: Vec<ColumnSelector>,
}

/// Where the normalization sequence comes from
#[derive(Debug, Clone)]
pub enum EbetacSource {
    /// Compute it from FES snapshot files
    Snapshots(FesFiles),
    /// Load it from a file written by an earlier run
    Cached(PathBuf),
}

/// A validated run: everything the pipeline needs, checked before any numeric work
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Thermal energy
    pub kt: f64,
    /// Standard or well-tempered metadynamics
    pub mode: BiasMode,
    /// Source of the normalization sequence
    pub ebetac: EbetacSource,
    /// Number of FES snapshots the sequence must cover
    pub num_snapshots: usize,
    /// The COLVAR file
    pub colvar: PathBuf,
    /// Reweighting CV columns
    pub cv_columns: Vec<ColumnSelector>,
    /// Bias columns
    pub bias_columns: Vec<ColumnSelector>,
    /// Grid points per CV
    pub bins: Vec<usize>,
    /// Supplied lower bounds
    pub cv_mins: Option<Vec<f64>>,
    /// Supplied upper bounds
    pub cv_maxs: Option<Vec<f64>>,
    /// Output FES file
    pub outfile: PathBuf,
    /// Where to save the normalization sequence, if anywhere
    pub exp_bct_out: Option<PathBuf>,
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReweightError::Config(format!(
            "file {} not found, check your inputs",
            path.display()
        )))
    }
}

impl Settings {
    /// Check the settings and turn them into a [`RunPlan`].
    ///
    /// Parameters are checked before the file system, so a dimension mismatch is reported
    /// without touching any input file.
    pub fn validate(&self) -> Result<RunPlan> {
        if !(self.kt > 0.0 && self.kt.is_finite()) {
            return Err(ReweightError::Config(format!(
                "kT must be a positive number (got {})",
                self.kt
            )));
        }
        let mode = BiasMode::from_bias_factor(self.bias_factor)?;

        let dim = self.colvar_rew_col.len();
        if dim == 0 || dim > MAX_DIMENSION {
            return Err(ReweightError::Config(format!(
                "reweighting supports 1 to {} CVs, got {}",
                MAX_DIMENSION, dim
            )));
        }
        if self.colvar_bias_col.is_empty() {
            return Err(ReweightError::Config(
                "at least one bias column is needed".to_string(),
            ));
        }

        let bins = match &self.bins {
            Some(bins) if bins.len() != dim => {
                return Err(ReweightError::Config(format!(
                    "the number of --bins provided ({}) does not match the dimension of \
                     reweighting CVs ({})",
                    bins.len(),
                    dim
                )));
            }
            Some(bins) => bins.clone(),
            None => vec![DEFAULT_BINS; dim],
        };
        if let Some(&b) = bins.iter().find(|&&b| b < 2) {
            return Err(ReweightError::Config(format!(
                "at least 2 bins per CV are needed, got {}",
                b
            )));
        }
        cell_count(&bins)?;

        for (name, bounds) in [("--cv-mins", &self.cv_mins), ("--cv-maxs", &self.cv_maxs)] {
            if let Some(bounds) = bounds {
                if bounds.len() != dim {
                    return Err(ReweightError::Config(format!(
                        "the number of {} provided ({}) does not match the dimension of \
                         reweighting CVs ({})",
                        name,
                        bounds.len(),
                        dim
                    )));
                }
                if let Some(x) = bounds.iter().find(|x| !x.is_finite()) {
                    return Err(ReweightError::Config(format!(
                        "{} must be finite numbers (got {})",
                        name, x
                    )));
                }
            }
        }
        if let (Some(mins), Some(maxs)) = (&self.cv_mins, &self.cv_maxs) {
            if let Some((j, (min, max))) = mins
                .iter()
                .zip(maxs)
                .enumerate()
                .find(|(_, (min, max))| min > max)
            {
                return Err(ReweightError::Config(format!(
                    "--cv-mins is above --cv-maxs for CV {} ({} > {})",
                    j + 1,
                    min,
                    max
                )));
            }
        }

        let ebetac = match (&self.exp_bct_file, &self.fes_prefix) {
            (Some(path), _) => EbetacSource::Cached(path.clone()),
            (None, Some(prefix)) => EbetacSource::Snapshots(FesFiles::new(
                prefix.clone(),
                self.num_fes,
                self.fes_col.clone(),
            )),
            (None, None) => {
                return Err(ReweightError::Config(
                    "either a FES file prefix or a precalculated ebetac file is needed"
                        .to_string(),
                ))
            }
        };
        if self.num_fes == 0 {
            return Err(ReweightError::Config(
                "at least one FES file is needed".to_string(),
            ));
        }

        require_file(&self.colvar)?;
        match &ebetac {
            EbetacSource::Cached(path) => require_file(path)?,
            EbetacSource::Snapshots(files) => {
                for path in files.paths() {
                    require_file(&path)?;
                }
            }
        }

        Ok(RunPlan {
            kt: self.kt,
            mode,
            ebetac,
            num_snapshots: self.num_fes,
            colvar: self.colvar.clone(),
            cv_columns: self.colvar_rew_col.clone(),
            bias_columns: self.colvar_bias_col.clone(),
            bins,
            cv_mins: self.cv_mins.clone(),
            cv_maxs: self.cv_maxs.clone(),
            outfile: self.outfile.clone(),
            exp_bct_out: self.exp_bct_out.clone(),
        })
    }
}
