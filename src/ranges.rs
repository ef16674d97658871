//! CV range discovery for the reweighting grid

use crate::errors::*;
use ndarray::{ArrayView2, Axis};

/// Find the `(min, max)` range of each of the `columns` of `rows`.
///
/// Bounds given in `mins` or `maxs` are used as-is and only the missing ones are scanned
/// for. Either slice, when present, must have one entry per column. An empty trajectory has
/// no range to find and is an error unless both bounds are supplied.
pub fn cv_ranges(
    rows: ArrayView2<'_, f64>,
    columns: &[usize],
    mins: Option<&[f64]>,
    maxs: Option<&[f64]>,
) -> Result<Vec<(f64, f64)>> {
    let dim = columns.len();
    for supplied in [mins, maxs].iter().flatten() {
        if supplied.len() != dim {
            return Err(ReweightError::Config(format!(
                "{} CV bounds given for {} CVs",
                supplied.len(),
                dim
            )));
        }
    }
    if let Some(&col) = columns.iter().find(|&&c| c >= rows.ncols()) {
        return Err(ReweightError::MissingColumn(format!(
            "{} (trajectory has {} columns)",
            col + 1,
            rows.ncols()
        )));
    }

    let mut lo = vec![f64::INFINITY; dim];
    let mut hi = vec![f64::NEG_INFINITY; dim];
    if mins.is_none() || maxs.is_none() {
        if rows.nrows() == 0 {
            return Err(ReweightError::InsufficientData(
                "cannot find CV ranges of an empty trajectory".to_string(),
            ));
        }
        for row in rows.axis_iter(Axis(0)) {
            for (j, &col) in columns.iter().enumerate() {
                let x = row[col];
                if x < lo[j] {
                    lo[j] = x;
                }
                if x > hi[j] {
                    hi[j] = x;
                }
            }
        }
    }

    let ranges: Vec<(f64, f64)> = (0..dim)
        .map(|j| {
            (
                mins.map_or(lo[j], |m| m[j]),
                maxs.map_or(hi[j], |m| m[j]),
            )
        })
        .collect();

    for (j, (min, max)) in ranges.iter().enumerate() {
        log::info!("CV[{}] range: {:10.5} ; {:10.5}", j, min, max);
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scans_every_row() {
        let rows = array![[0.0, 1.0, -2.0], [1.0, 5.0, 7.0], [2.0, 3.0, 0.5]];
        let ranges = cv_ranges(rows.view(), &[1, 2], None, None).unwrap();
        assert_eq!(ranges, vec![(1.0, 5.0), (-2.0, 7.0)]);
    }

    #[test]
    fn supplied_bounds_win() {
        let rows = array![[0.0, 1.0], [1.0, 5.0], [2.0, 3.0]];
        assert_eq!(
            cv_ranges(rows.view(), &[1], Some(&[-10.0][..]), None).unwrap(),
            vec![(-10.0, 5.0)]
        );
        assert_eq!(
            cv_ranges(rows.view(), &[1], None, Some(&[10.0][..])).unwrap(),
            vec![(1.0, 10.0)]
        );
    }

    #[test]
    fn empty_trajectory() {
        let rows = ndarray::Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            cv_ranges(rows.view(), &[1], None, None),
            Err(ReweightError::InsufficientData(_))
        ));
        assert_eq!(
            cv_ranges(rows.view(), &[1], Some(&[0.0][..]), Some(&[1.0][..])).unwrap(),
            vec![(0.0, 1.0)]
        );
    }

    #[test]
    fn bound_count_mismatch() {
        let rows = array![[0.0, 1.0, 2.0]];
        assert!(matches!(
            cv_ranges(rows.view(), &[1, 2], Some(&[0.0][..]), None),
            Err(ReweightError::Config(_))
        ));
    }
}
