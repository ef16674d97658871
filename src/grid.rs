//! Regular rectilinear grids for the reweighted FES

use crate::errors::*;
use ndarray::{Array1, ArrayD, IxDyn};

/// Default number of grid points along each CV
pub const DEFAULT_BINS: usize = 100;

/// Total number of grid points for the given points per dimension.
///
/// Fails when the product, or its size in bytes, does not fit in `isize`.
pub fn cell_count(bins: &[usize]) -> Result<usize> {
    bins.iter()
        .try_fold(1usize, |acc, &b| acc.checked_mul(b))
        .filter(|&n| {
            n.checked_mul(std::mem::size_of::<f64>())
                .map_or(false, |bytes| bytes <= isize::MAX as usize)
        })
        .ok_or_else(|| {
            ReweightError::Config(format!("a grid of {:?} points is too large", bins))
        })
}

/// One axis of the grid: `bins` evenly spaced points from `min` to `max` inclusive
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxis {
    min: f64,
    max: f64,
    bins: usize,
    step: f64,
}

impl GridAxis {
    /// An axis over `[min, max]` with `bins >= 2` points
    pub fn new(min: f64, max: f64, bins: usize) -> Result<Self> {
        if bins < 2 {
            return Err(ReweightError::Config(format!(
                "a grid axis needs at least 2 points, got {}",
                bins
            )));
        }
        if !(min.is_finite() && max.is_finite()) || max < min {
            return Err(ReweightError::Config(format!(
                "invalid grid range [{}, {}]",
                min, max
            )));
        }
        let step = (max - min) / (bins - 1) as f64;
        Ok(Self {
            min,
            max,
            bins,
            step,
        })
    }

    /// Lower bound
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Number of grid points
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Spacing between neighbouring points
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Coordinate of point `n`
    pub fn value(&self, n: usize) -> f64 {
        self.min + n as f64 * self.step
    }

    /// All coordinates in increasing order
    pub fn values(&self) -> Array1<f64> {
        (0..self.bins).map(|n| self.value(n)).collect()
    }

    /// Index of the grid point closest to `x`.
    ///
    /// Values outside the range land on the nearest end point. A value exactly halfway
    /// between two points goes to the lower one.
    pub fn nearest(&self, x: f64) -> usize {
        if self.step == 0.0 {
            return 0;
        }
        let t = ((x - self.min) / self.step - 0.5).ceil();
        if t <= 0.0 {
            0
        } else if t >= (self.bins - 1) as f64 {
            self.bins - 1
        } else {
            t as usize
        }
    }
}

/// The full grid: one axis per reweighting CV
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid {
    axes: Vec<GridAxis>,
}

impl Grid {
    /// Build a grid from per-dimension bounds and bin counts
    pub fn new(bounds: &[(f64, f64)], bins: &[usize]) -> Result<Self> {
        if bounds.len() != bins.len() {
            return Err(ReweightError::Config(format!(
                "{} bin counts given for {} CVs",
                bins.len(),
                bounds.len()
            )));
        }
        cell_count(bins)?;
        let axes = bounds
            .iter()
            .zip(bins)
            .map(|(&(min, max), &b)| GridAxis::new(min, max, b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { axes })
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Number of points along each dimension
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(GridAxis::bins).collect()
    }

    /// The axes
    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    /// A zero-filled array with one element per grid point
    pub fn zeros(&self) -> Result<ArrayD<f64>> {
        let shape = self.shape();
        let n = cell_count(&shape)?;
        let mut values = Vec::new();
        values.try_reserve_exact(n).map_err(|e| {
            ReweightError::Config(format!("can not allocate a grid of {:?} points: {}", shape, e))
        })?;
        values.resize(n, 0.0);
        ArrayD::from_shape_vec(IxDyn(&shape), values)
            .map_err(|e| ReweightError::Config(e.to_string()))
    }

    /// Write the index of the cell nearest to `point` into `cell`
    pub fn nearest_cell(&self, point: impl IntoIterator<Item = f64>, cell: &mut [usize]) {
        for ((slot, axis), x) in cell.iter_mut().zip(&self.axes).zip(point) {
            *slot = axis.nearest(x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// The reference behaviour: smallest absolute difference, first index on ties
    fn nearest_by_scan(axis: &GridAxis, x: f64) -> usize {
        let values = axis.values();
        let mut best = 0;
        for (i, v) in values.iter().enumerate() {
            if (v - x).abs() < (values[best] - x).abs() {
                best = i;
            }
        }
        best
    }

    #[test]
    fn axis_values() {
        let axis = GridAxis::new(-1.0, 1.0, 5).unwrap();
        assert_relative_eq!(axis.step(), 0.5);
        assert_eq!((axis.min(), axis.max(), axis.bins()), (-1.0, 1.0, 5));
        assert_eq!(axis.values().to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn nearest_matches_scan() {
        let axis = GridAxis::new(-3.0, 2.0, 11).unwrap();
        for k in 0..200 {
            let x = -4.0 + k as f64 * 0.0371;
            assert_eq!(axis.nearest(x), nearest_by_scan(&axis, x), "x = {}", x);
        }
    }

    #[test]
    fn ties_go_low() {
        let axis = GridAxis::new(0.0, 3.0, 4).unwrap();
        assert_eq!(axis.nearest(0.5), 0);
        assert_eq!(axis.nearest(1.5), 1);
        assert_eq!(axis.nearest(2.5), 2);
    }

    #[test]
    fn clamps_outside_values() {
        let axis = GridAxis::new(0.0, 3.0, 4).unwrap();
        assert_eq!(axis.nearest(-10.0), 0);
        assert_eq!(axis.nearest(10.0), 3);
    }

    #[test]
    fn degenerate_range() {
        let axis = GridAxis::new(2.0, 2.0, 10).unwrap();
        assert_eq!(axis.nearest(5.0), 0);
        assert_eq!(axis.nearest(2.0), 0);
    }

    #[test]
    fn invalid_axes() {
        assert!(GridAxis::new(0.0, 1.0, 1).is_err());
        assert!(GridAxis::new(1.0, 0.0, 10).is_err());
        assert!(GridAxis::new(f64::NAN, 1.0, 10).is_err());
        assert!(Grid::new(&[(0.0, 1.0), (0.0, 1.0)], &[10, 10, 10]).is_err());
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert_eq!(cell_count(&[3, 5, 7]).unwrap(), 105);
        let huge = [1 << 21, 1 << 21, 1 << 21];
        assert_eq!(cell_count(&huge[..2]).unwrap(), 1 << 42);
        assert!(matches!(cell_count(&huge), Err(ReweightError::Config(_))));
        assert!(matches!(
            Grid::new(&[(0.0, 1.0); 3], &huge),
            Err(ReweightError::Config(_))
        ));
    }

    #[test]
    fn nearest_cell() {
        let grid = Grid::new(&[(0.0, 1.0), (-1.0, 1.0)], &[3, 5]).unwrap();
        let mut cell = [0; 2];
        grid.nearest_cell(vec![0.9, -0.4], &mut cell);
        assert_eq!(cell, [2, 1]);
        assert_eq!(grid.shape(), vec![3, 5]);
        let zeros = grid.zeros().unwrap();
        assert_eq!(zeros.shape(), &[3, 5]);
        assert!(zeros.iter().all(|&v| v == 0.0));
    }
}
