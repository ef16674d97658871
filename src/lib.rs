#![warn(rust_2018_idioms, missing_docs, missing_debug_implementations)]

//! Time-independent free energy reconstruction from metadynamics simulations.
//!
//! A metadynamics run deposits a time-dependent bias $V(s,t)$ on a few collective variables
//! (CVs). Reweighting recovers the unbiased free energy as a function of any CVs recorded
//! during the run, biased or not, by weighting each frame with $e^{\beta (V(s,t) - c(t))}$.
//! Here $c(t)$ is estimated from FES snapshots written during the run ([`ebetac`]), the grid
//! bounds come from the trajectory ([`ranges`]) and the weights are histogrammed on a grid of
//! up to three CVs ([`reweight`]).
//!
//! ```no_run
//! use metad_reweight::*;
//!
//! # fn main() -> metad_reweight::Result<()> {
//! let files = FesFiles::new("fes_", 100, ColumnSelector::Position(1));
//! let ebetac = NormalizationSequence::estimate(&files, 2.49, BiasMode::Standard)?;
//!
//! let colvar = Colvar::read("COLVAR")?;
//! let bounds = cv_ranges(colvar.rows().view(), &[1], None, None)?;
//!
//! let surface = Reweighting::builder()
//!     .kt(2.49)
//!     .cv_columns(vec![1])
//!     .bias_columns(vec![3])
//!     .bounds(bounds)
//!     .ebetac(ebetac)
//!     .build()?
//!     .compute_colvar(&colvar)?;
//! surface.save("fes_rew.dat")?;
//! # Ok(())
//! # }
//! ```
//!
//! Please reference the following if you use this code in your research:
//!
//! [1] Tiwary P and Parrinello M. A Time-Independent Free Energy Estimator for Metadynamics.
//! J. Phys. Chem. B 119:736-742, 2015. <http://dx.doi.org/10.1021/jp504920s>

#[macro_use]
extern crate derive_builder;

pub mod colvar;
pub mod config;
pub mod ebetac;
pub mod errors;
pub mod grid;
mod output;
pub mod pipeline;
pub mod ranges;
pub mod reweight;
pub mod table;
pub mod testsystems;

pub use colvar::Colvar;
pub use config::Settings;
pub use ebetac::{BiasMode, FesFiles, NormalizationSequence, SnapshotSource};
pub use errors::{ReweightError, Result};
pub use grid::{Grid, GridAxis};
pub use ranges::cv_ranges;
pub use reweight::{FreeEnergySurface, Reweighting};
pub use table::{ColumnSelector, Table};
