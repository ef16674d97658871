//! Boltzmann reweighting of a biased trajectory onto a grid

use crate::colvar::Colvar;
use crate::ebetac::NormalizationSequence;
use crate::errors::*;
use crate::grid::{Grid, DEFAULT_BINS};
use ndarray::{Array1, ArrayD, ArrayView2, Axis};

/// Largest number of CVs a surface can be projected on
pub const MAX_DIMENSION: usize = 3;

/// Boltzmann reweighting of a metadynamics trajectory onto a regular grid of CVs.
///
/// Each trajectory row is weighted by $e^{\beta (V(s,t) - c(t))}$, where $V$ is the bias
/// at the time of the row and $e^{\beta c(t)}$ is taken from the [`NormalizationSequence`]
/// entry of the snapshot closest in time. The weights are histogrammed on the nearest grid
/// point and turned into a free energy $F = -k_B T \ln P$, shifted so that its minimum is zero.
///
/// # Notes
///
/// Rows are assigned to snapshots by apportioning the trajectory into as many blocks of equal
/// row count as there are snapshots. This assumes the snapshots were written at a constant
/// stride over the same time span as the trajectory; the trajectory and snapshot strides need
/// not match.
///
/// # References
///
/// 1. Tiwary P and Parrinello M. A Time-Independent Free Energy Estimator for Metadynamics.
/// J. Phys. Chem. B 119:736-742, 2015 <http://dx.doi.org/10.1021/jp504920s>
#[derive(Builder, Debug)]
#[builder(build_fn(
    validate = "Self::validate",
    name = "build_inner",
    private,
    error = "ReweightError"
))]
pub struct Reweighting {
    /// Thermal energy $k_B T$ in the energy units of the bias
    kt: f64,

    /// Zero-based trajectory columns holding the CVs to project on
    cv_columns: Vec<usize>,

    /// Zero-based trajectory columns holding bias energies; the bias is their sum
    ///
    /// Include every external potential (walls, restraints) acting on the run here, not just
    /// the metadynamics bias.
    bias_columns: Vec<usize>,

    /// `(min, max)` of the grid along each CV
    bounds: Vec<(f64, f64)>,

    /// Number of grid points along each CV, [`DEFAULT_BINS`] each if unset
    #[builder(setter(strip_option), default)]
    bins: Option<Vec<usize>>,

    /// `ebetac[k]` is $e^{\beta c(t)}$ at the time of FES snapshot `k`
    ebetac: NormalizationSequence,

    /// Number of FES snapshots the sequence is expected to cover
    ///
    /// Defaults to the length of `ebetac`. Set it when the sequence comes from a cache file to
    /// catch a cache that belongs to another run.
    #[builder(setter(strip_option), default)]
    num_snapshots: Option<usize>,

    #[builder(setter(skip), default)]
    grid: Grid,
}

impl ReweightingBuilder {
    fn validate(&self) -> Result<()> {
        if let Some(kt) = self.kt {
            if !(kt > 0.0 && kt.is_finite()) {
                return Err(ReweightError::Config(format!(
                    "kT must be a positive number (got {})",
                    kt
                )));
            }
        }

        if let Some(cv_columns) = &self.cv_columns {
            let dim = cv_columns.len();
            if dim == 0 || dim > MAX_DIMENSION {
                return Err(ReweightError::Config(format!(
                    "reweighting supports 1 to {} CVs, got {}",
                    MAX_DIMENSION, dim
                )));
            }
            if let Some(bounds) = &self.bounds {
                if bounds.len() != dim {
                    return Err(ReweightError::Config(format!(
                        "{} CV ranges given for {} CVs",
                        bounds.len(),
                        dim
                    )));
                }
            }
            if let Some(Some(bins)) = &self.bins {
                if bins.len() != dim {
                    return Err(ReweightError::Config(format!(
                        "the number of bin counts ({}) does not match the number of CVs ({})",
                        bins.len(),
                        dim
                    )));
                }
            }
        }

        if let Some(bias_columns) = &self.bias_columns {
            if bias_columns.is_empty() {
                return Err(ReweightError::Config(
                    "at least one bias column is needed".to_string(),
                ));
            }
        }

        if let Some(ebetac) = &self.ebetac {
            if ebetac.is_empty() {
                return Err(ReweightError::InsufficientData(
                    "the normalization sequence is empty".to_string(),
                ));
            }
            if let Some(Some(n)) = self.num_snapshots {
                if ebetac.len() != n {
                    return Err(ReweightError::ArrayLengthMismatch(ebetac.len(), n));
                }
            }
        }

        Ok(())
    }

    /// Build the reweighting and its grid
    pub fn build(&self) -> Result<Reweighting> {
        self.build_inner()?.init()
    }
}

impl Reweighting {
    /// Lay out the grid; called by the build method
    fn init(mut self) -> Result<Self> {
        let bins = self
            .bins
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_BINS; self.cv_columns.len()]);
        self.grid = Grid::new(&self.bounds, &bins)?;
        for (j, axis) in self.grid.axes().iter().enumerate() {
            log::info!("Grid ds CV[{}]={}", j, axis.step());
        }
        Ok(self)
    }

    /// Get a new builder for the `Reweighting` struct. `Reweighting` can only be constructed
    /// via the builder.
    pub fn builder() -> ReweightingBuilder {
        ReweightingBuilder::default()
    }

    /// Thermal energy $k_B T$
    pub fn kt(&self) -> f64 {
        self.kt
    }

    /// The grid the surface is computed on
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The normalization sequence
    pub fn ebetac(&self) -> &NormalizationSequence {
        &self.ebetac
    }

    /// Number of CVs
    pub fn dimension(&self) -> usize {
        self.cv_columns.len()
    }

    /// Reweight a COLVAR trajectory
    pub fn compute_colvar(&self, colvar: &Colvar) -> Result<FreeEnergySurface> {
        self.compute(colvar.rows().view())
    }

    /// Reweight trajectory `rows`, one row per time point in time order.
    ///
    /// Grid points no row was assigned to have an infinite free energy. It is an error if no
    /// grid point ends up with a finite one.
    pub fn compute(&self, rows: ArrayView2<'_, f64>) -> Result<FreeEnergySurface> {
        let t = rows.nrows();
        let n = self.ebetac.len();

        if let Some(&col) = self
            .cv_columns
            .iter()
            .chain(&self.bias_columns)
            .find(|&&c| c >= rows.ncols())
        {
            return Err(ReweightError::MissingColumn(format!(
                "{} (trajectory has {} columns)",
                col + 1,
                rows.ncols()
            )));
        }
        if t == 0 {
            return Err(ReweightError::InsufficientData(
                "the trajectory is empty".to_string(),
            ));
        }

        log::info!("Calculating reweighted FES..");

        let mut histogram = self.grid.zeros()?;
        let mut denom = 0.0;
        let mut cell = vec![0; self.dimension()];
        let ebetac = self.ebetac.values();

        for (i, row) in rows.axis_iter(Axis(0)).enumerate() {
            self.grid
                .nearest_cell(self.cv_columns.iter().map(|&c| row[c]), &mut cell);

            let index = snapshot_index(i, t, n);
            let norm = ebetac
                .get(index)
                .ok_or(ReweightError::SnapshotIndexOutOfRange {
                    row: i,
                    index,
                    len: n,
                })?;

            let bias: f64 = self.bias_columns.iter().map(|&c| row[c]).sum();
            let weight = (bias / self.kt).exp() / norm;

            histogram[&cell[..]] += weight;
            denom += weight;
        }

        histogram /= denom;

        let kt = self.kt;
        let mut fes = histogram.mapv_into(|p| -kt * p.ln());

        let floor = fes
            .iter()
            .copied()
            .filter(|f| f.is_finite())
            .fold(None, |min: Option<f64>, f| Some(min.map_or(f, |m| m.min(f))))
            .ok_or_else(|| {
                ReweightError::InsufficientData(format!(
                    "no grid point received a finite weight from the {} trajectory rows",
                    t
                ))
            })?;
        fes.mapv_inplace(|f| f - floor);

        let surface = FreeEnergySurface {
            axes: self.grid.axes().iter().map(|a| a.values()).collect(),
            fes,
        };
        let unvisited = surface.unvisited();
        if unvisited > 0 {
            log::debug!(
                "{} of {} grid points were never visited",
                unvisited,
                surface.fes.len()
            );
        }
        Ok(surface)
    }
}

/// Index of the FES snapshot paired with trajectory row `row` of `rows`, given `snapshots`
/// snapshots: $\lceil (i / T) N \rceil - 1$, and 0 for the first row.
pub fn snapshot_index(row: usize, rows: usize, snapshots: usize) -> usize {
    if rows == 0 {
        return 0;
    }
    ((row * snapshots + rows - 1) / rows).saturating_sub(1)
}

/// A reweighted free energy surface on a regular grid
#[derive(Debug, Clone, PartialEq)]
pub struct FreeEnergySurface {
    axes: Vec<Array1<f64>>,
    fes: ArrayD<f64>,
}

impl FreeEnergySurface {
    /// Coordinates of the grid points along each CV
    pub fn axes(&self) -> &[Array1<f64>] {
        &self.axes
    }

    /// `fes[[i, j, ..]]` is the free energy at `(axes[0][i], axes[1][j], ..)`
    ///
    /// The minimum is zero; grid points without data hold `+inf`.
    pub fn fes(&self) -> &ArrayD<f64> {
        &self.fes
    }

    /// Number of CVs
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Number of grid points without data
    pub fn unvisited(&self) -> usize {
        self.fes.iter().filter(|f| f.is_infinite()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn builder_1d() -> ReweightingBuilder {
        let mut builder = Reweighting::builder();
        builder
            .kt(1.0)
            .cv_columns(vec![1])
            .bias_columns(vec![2])
            .bounds(vec![(0.0, 3.0)])
            .bins(vec![4])
            .ebetac(vec![1.0; 4].into());
        builder
    }

    #[test]
    fn build_reweighting() {
        let rew = builder_1d().build().unwrap();
        assert_eq!(rew.kt(), 1.0);
        assert_eq!(rew.dimension(), 1);
        assert_eq!(rew.grid().shape(), vec![4]);
        assert_eq!(rew.ebetac().len(), 4);
    }

    #[test]
    fn default_bins() {
        let rew = Reweighting::builder()
            .kt(2.49)
            .cv_columns(vec![1, 2])
            .bias_columns(vec![3])
            .bounds(vec![(0.0, 1.0), (0.0, 1.0)])
            .ebetac(vec![1.0].into())
            .build()
            .unwrap();
        assert_eq!(rew.grid().shape(), vec![DEFAULT_BINS, DEFAULT_BINS]);
    }

    #[test]
    fn invalid_builds() {
        assert!(matches!(
            builder_1d().kt(0.0).build(),
            Err(ReweightError::Config(_))
        ));
        assert!(matches!(
            builder_1d().bins(vec![4, 4]).build(),
            Err(ReweightError::Config(_))
        ));
        assert!(matches!(
            builder_1d().bins(vec![1]).build(),
            Err(ReweightError::Config(_))
        ));
        assert!(matches!(
            builder_1d().cv_columns(vec![1, 2, 3, 4]).build(),
            Err(ReweightError::Config(_))
        ));
        assert!(matches!(
            builder_1d().bias_columns(vec![]).build(),
            Err(ReweightError::Config(_))
        ));
        assert!(matches!(
            builder_1d().num_snapshots(5).build(),
            Err(ReweightError::ArrayLengthMismatch(4, 5))
        ));
        assert!(matches!(
            Reweighting::builder().kt(1.0).build(),
            Err(ReweightError::BuilderError(_))
        ));
    }

    #[test]
    fn snapshot_apportionment() {
        // 10 rows over 4 snapshots
        let indices: Vec<usize> = (0..10).map(|i| snapshot_index(i, 10, 4)).collect();
        assert_eq!(indices, vec![0, 0, 0, 1, 1, 1, 2, 2, 3, 3]);
        // One row per snapshot
        let indices: Vec<usize> = (0..4).map(|i| snapshot_index(i, 4, 4)).collect();
        assert_eq!(indices, vec![0, 0, 1, 2]);
        assert!((0..1000).all(|i| snapshot_index(i, 1000, 7) < 7));
    }

    #[test]
    fn every_row_its_own_bin() {
        let rows = array![
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 2.0, 0.0],
            [3.0, 3.0, 0.0]
        ];
        let surface = builder_1d().build().unwrap().compute(rows.view()).unwrap();
        assert_eq!(surface.axes()[0], array![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(surface.fes().as_slice().unwrap(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn bias_reweights_counts() {
        // Two rows in bin 0 without bias, one row in bin 1 with bias ln 2
        let rows = array![[0.0, 0.1, 0.0], [1.0, -0.2, 0.0], [2.0, 2.9, 2f64.ln()]];
        let surface = builder_1d()
            .ebetac(vec![1.0].into())
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();
        let fes = surface.fes();
        assert_relative_eq!(fes[[0]], 0.0, epsilon = 1e-12);
        assert_relative_eq!(fes[[3]], 0.0, epsilon = 1e-12);
        assert!(fes[[1]].is_infinite() && fes[[1]] > 0.0);
        assert!(fes[[2]].is_infinite());
        assert_eq!(surface.unvisited(), 2);
    }

    #[test]
    fn ebetac_divides_weights() {
        // The last row falls in the second snapshot block, where ebetac = e
        let rows = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 3.0, 0.0]];
        let surface = builder_1d()
            .ebetac(vec![1.0, 1f64.exp()].into())
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();
        assert_relative_eq!(surface.fes()[[0]], 0.0);
        assert_relative_eq!(surface.fes()[[3]], 1.0 + 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn two_dimensional_grid() {
        let rows = array![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 0.0],
            [2.0, 1.0, 1.0, 0.0],
            [3.0, 0.0, 1.0, 0.0]
        ];
        let surface = Reweighting::builder()
            .kt(1.0)
            .cv_columns(vec![1, 2])
            .bias_columns(vec![3])
            .bounds(vec![(0.0, 1.0), (0.0, 1.0)])
            .bins(vec![2, 2])
            .ebetac(vec![1.0].into())
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();
        let fes = surface.fes();
        assert_eq!(fes.shape(), &[2, 2]);
        assert_relative_eq!(fes[[1, 1]], 0.0);
        assert_relative_eq!(fes[[0, 0]], 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(fes[[0, 1]], 2f64.ln(), epsilon = 1e-12);
        assert!(fes[[1, 0]].is_infinite());
    }

    #[test]
    fn bias_columns_are_summed() {
        let rows = array![[0.0, 0.0, 1.0, -1.0], [1.0, 3.0, 0.0, 0.0]];
        let surface = builder_1d()
            .bias_columns(vec![2, 3])
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();
        assert_relative_eq!(surface.fes()[[0]], 0.0);
        assert_relative_eq!(surface.fes()[[3]], 0.0);
    }

    #[test]
    fn deterministic() {
        let rows = Array2::from_shape_fn((500, 3), |(i, j)| match j {
            0 => i as f64,
            1 => ((i * 37) % 101) as f64 * 0.03,
            _ => ((i * 13) % 7) as f64 * 0.4,
        });
        let rew = builder_1d()
            .bins(vec![25])
            .ebetac(vec![1.0, 1.5, 2.0, 2.5, 3.0].into())
            .build()
            .unwrap();
        let first = rew.compute(rows.view()).unwrap();
        let second = rew.compute(rows.view()).unwrap();
        let bits = |s: &FreeEnergySurface| s.fes().iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        let min = first.fes().iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(min, 0.0);
    }

    #[test]
    fn no_finite_cell() {
        // exp(1000) overflows, so every weight is inf / inf
        let rows = array![[0.0, 1.0, 1000.0]];
        let result = builder_1d()
            .ebetac(vec![1.0].into())
            .build()
            .unwrap()
            .compute(rows.view());
        assert!(matches!(result, Err(ReweightError::InsufficientData(_))));
    }

    #[test]
    fn empty_trajectory() {
        let rows = Array2::<f64>::zeros((0, 3));
        let result = builder_1d().build().unwrap().compute(rows.view());
        assert!(matches!(result, Err(ReweightError::InsufficientData(_))));
    }

    #[test]
    fn missing_trajectory_column() {
        let rows = array![[0.0, 1.0]];
        let result = builder_1d().build().unwrap().compute(rows.view());
        assert!(matches!(result, Err(ReweightError::MissingColumn(_))));
    }
}
