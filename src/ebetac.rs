//! The normalization sequence $e^{\beta c(t)}$.
//!
//! $c(t)$ estimates the reversible work done on the system by the metadynamics bias up to
//! time $t$. It is computed from a series of FES snapshots written during the run (for
//! instance with `plumed sum_hills --stride`), one value per snapshot, using eqs. 3 and 12
//! of [1].
//!
//! # References
//!
//! 1. Tiwary P and Parrinello M. A Time-Independent Free Energy Estimator for Metadynamics.
//! J. Phys. Chem. B 119:736-742, 2015 <http://dx.doi.org/10.1021/jp504920s>

use crate::errors::*;
use crate::table::{ColumnSelector, Table};
use ndarray::{Array1, ArrayView1};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Which flavour of metadynamics deposited the bias
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiasMode {
    /// Plain metadynamics with a constant hill height
    Standard,
    /// Well-tempered metadynamics with bias factor $\gamma > 0$
    WellTempered {
        /// $\gamma = (T + \Delta T) / T$
        bias_factor: f64,
    },
}

impl BiasMode {
    /// Interpret an optional bias factor. No factor means standard metadynamics; a factor of
    /// zero is ambiguous and a negative factor is meaningless, so both are rejected. An
    /// infinite factor is the standard metadynamics limit and is accepted.
    pub fn from_bias_factor(bias_factor: Option<f64>) -> Result<Self> {
        match bias_factor {
            None => Ok(Self::Standard),
            Some(gamma) if gamma > 0.0 => {
                Ok(Self::WellTempered { bias_factor: gamma })
            }
            Some(gamma) if gamma == 0.0 => Err(ReweightError::Config(
                "a bias factor of 0 is ambiguous; if the run was well-tempered check the value, \
                 otherwise omit the bias factor"
                    .to_string(),
            )),
            Some(gamma) if gamma < 0.0 => Err(ReweightError::Config(format!(
                "bias factor can not be negative (got {})",
                gamma
            ))),
            Some(gamma) => Err(ReweightError::Config(format!(
                "bias factor must be a number (got {})",
                gamma
            ))),
        }
    }
}

/// $e^{\beta c(t)}$ for a single FES snapshot.
///
/// `free_energies` is the free energy column of the snapshot and `kt` the thermal energy in
/// the same units.
///
/// $$
/// e^{\beta c(t)} = \frac{\sum_s e^{-\beta F(s,t)}}{\sum_s e^{-\beta F(s,t)/\gamma}}
/// $$
///
/// for well-tempered metadynamics, and the same numerator over the number of grid points for
/// standard metadynamics. Overflow is not guarded against; the result may be `inf` or `0`.
pub fn snapshot_ebetac(free_energies: ArrayView1<'_, f64>, kt: f64, mode: BiasMode) -> f64 {
    let s1: f64 = free_energies.iter().map(|&p| (-p / kt).exp()).sum();
    let s2 = match mode {
        BiasMode::Standard => free_energies.len() as f64,
        BiasMode::WellTempered { bias_factor } => free_energies
            .iter()
            .map(|&p| (-p / (kt * bias_factor)).exp())
            .sum(),
    };
    s1 / s2
}

/// Something that can hand out FES snapshots by index
pub trait SnapshotSource {
    /// Number of snapshots
    fn len(&self) -> usize;

    /// True if there are no snapshots
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The free energy column of snapshot `index`
    fn free_energies(&self, index: usize) -> Result<Array1<f64>>;
}

/// FES snapshots stored as `{prefix}0.dat`, `{prefix}1.dat`, ...
#[derive(Debug, Clone)]
pub struct FesFiles {
    prefix: String,
    count: usize,
    column: ColumnSelector,
}

impl FesFiles {
    /// `count` snapshot files sharing `prefix`, free energy in `column`
    pub fn new(prefix: impl Into<String>, count: usize, column: ColumnSelector) -> Self {
        Self {
            prefix: prefix.into(),
            count,
            column,
        }
    }

    /// Path of snapshot `index`; indices start at 0
    pub fn path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}{}.dat", self.prefix, index))
    }

    /// Paths of all snapshots in order
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..self.count).map(move |i| self.path(i))
    }
}

impl SnapshotSource for FesFiles {
    fn len(&self) -> usize {
        self.count
    }

    fn free_energies(&self, index: usize) -> Result<Array1<f64>> {
        let table = Table::read(self.path(index))?;
        Ok(table.column(&self.column)?.to_owned())
    }
}

impl SnapshotSource for [Array1<f64>] {
    fn len(&self) -> usize {
        <[Array1<f64>]>::len(self)
    }

    fn free_energies(&self, index: usize) -> Result<Array1<f64>> {
        self.get(index)
            .cloned()
            .ok_or_else(|| ReweightError::ArrayLengthMismatch(index + 1, self.len()))
    }
}

/// The sequence $e^{\beta c(t_k)}$, one value per FES snapshot $k$
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationSequence(Array1<f64>);

impl NormalizationSequence {
    /// Compute the sequence from every snapshot of `source`
    pub fn estimate<S: SnapshotSource + ?Sized>(
        source: &S,
        kt: f64,
        mode: BiasMode,
    ) -> Result<Self> {
        let n = source.len();
        log::info!("Reading {} FES files...", n);

        let mut ebetac = Vec::with_capacity(n);
        for i in 0..n {
            if n > 10 && i % (n / 10) == 0 {
                log::info!("{} of {} ({:.0}%) done", i, n, i as f64 * 100.0 / n as f64);
            }
            let free_energies = source.free_energies(i)?;
            let value = snapshot_ebetac(free_energies.view(), kt, mode);
            log::debug!("ebetac[{}] = {}", i, value);
            ebetac.push(value);
        }

        Ok(Self(Array1::from(ebetac)))
    }

    /// Load a sequence saved by [`NormalizationSequence::save`], one value per line
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::read(path)?;
        if table.ncols() > 1 {
            return Err(ReweightError::Parse {
                path: path.to_path_buf(),
                line: 0,
                message: format!("expected one value per line, found {} columns", table.ncols()),
            });
        }
        let values = table.data().iter().copied().collect::<Array1<f64>>();
        log::info!("Loaded {} ebetac values from {}", values.len(), path.display());
        Ok(Self(values))
    }

    /// Save the sequence, one value per line in index order
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ReweightError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ReweightError::io(path, e))
    }

    /// Write the sequence in the cache format
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for value in self.0.iter() {
            writeln!(writer, "{:.18e}", value)?;
        }
        Ok(())
    }

    /// Number of snapshots covered
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the sequence covers no snapshots
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The values
    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }
}

impl From<Array1<f64>> for NormalizationSequence {
    fn from(values: Array1<f64>) -> Self {
        Self(values)
    }
}

impl From<Vec<f64>> for NormalizationSequence {
    fn from(values: Vec<f64>) -> Self {
        Self(Array1::from(values))
    }
}
