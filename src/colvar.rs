//! CV trajectories (PLUMED COLVAR files)

use crate::errors::*;
use crate::table::{ColumnSelector, Table};
use ndarray::{Array2, ArrayView1, Axis};
use std::path::Path;

/// A CV trajectory: one row per sampled time, with the CVs and bias terms as columns.
///
/// Rows are ordered by time and every time occurs once. Restarted simulations append rows
/// whose times repeat earlier ones; [`Colvar::from_table`] keeps the last occurrence of each
/// time.
#[derive(Debug, Clone)]
pub struct Colvar {
    table: Table,
}

impl Colvar {
    /// Read and deduplicate a COLVAR file. The first column is taken to be time
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_table(Table::read(path)?, &ColumnSelector::Position(0))
    }

    /// Build a trajectory from a table, dropping rows with a repeated `time` value
    pub fn from_table(table: Table, time: &ColumnSelector) -> Result<Self> {
        if table.nrows() == 0 {
            return Ok(Self { table });
        }
        let time_col = table.resolve(time)?;
        let data = table.data();
        let times = data.index_axis(Axis(1), time_col);

        let mut order: Vec<usize> = (0..data.nrows()).collect();
        order.sort_by(|&a, &b| times[a].total_cmp(&times[b]).then(a.cmp(&b)));

        // Within a run of equal times the last original row comes last after the sort
        let mut keep: Vec<usize> = Vec::with_capacity(order.len());
        for i in order {
            match keep.last_mut() {
                Some(last) if times[*last] == times[i] => *last = i,
                _ => keep.push(i),
            }
        }

        let dropped = data.nrows() - keep.len();
        if dropped > 0 {
            log::info!("Dropped {} COLVAR rows with repeated times", dropped);
        }

        let deduped = if dropped == 0 && keep.iter().enumerate().all(|(i, &k)| i == k) {
            data.to_owned()
        } else {
            data.select(Axis(0), &keep)
        };

        let fields = table.fields().to_vec();
        let table = if fields.is_empty() {
            Table::from_array(deduped)
        } else {
            Table::with_fields(fields, deduped)?
        };

        Ok(Self { table })
    }

    /// Wrap rows that are already in time order without deduplicating them
    pub fn from_rows(rows: Array2<f64>) -> Self {
        Self {
            table: Table::from_array(rows),
        }
    }

    /// Number of rows (time points)
    pub fn len(&self) -> usize {
        self.table.nrows()
    }

    /// True if the trajectory has no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw rows
    pub fn rows(&self) -> &Array2<f64> {
        self.table.data()
    }

    /// The underlying table, for resolving column selectors
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Zero-based indices of the selected columns
    pub fn resolve_all(&self, selectors: &[ColumnSelector]) -> Result<Vec<usize>> {
        self.table.resolve_all(selectors)
    }

    /// One column over time
    pub fn column(&self, selector: &ColumnSelector) -> Result<ArrayView1<'_, f64>> {
        self.table.column(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn restart_rows_replace_earlier_ones() {
        let text = "\
#! FIELDS time cv bias
0.0 1.0 0.0
1.0 2.0 0.1
2.0 3.0 0.2
1.0 20.0 1.1
2.0 30.0 1.2
3.0 40.0 1.3
";
        let table = Table::from_reader(text.as_bytes(), "COLVAR").unwrap();
        let colvar = Colvar::from_table(table, &ColumnSelector::Position(0)).unwrap();

        assert_eq!(colvar.len(), 4);
        assert_eq!(
            colvar.column(&"time".parse().unwrap()).unwrap(),
            array![0.0, 1.0, 2.0, 3.0]
        );
        assert_eq!(
            colvar.column(&"cv".parse().unwrap()).unwrap(),
            array![1.0, 20.0, 30.0, 40.0]
        );
    }

    #[test]
    fn ordered_input_is_untouched() {
        let rows = array![[0.0, 5.0], [0.5, 6.0], [1.0, 7.0]];
        let colvar =
            Colvar::from_table(Table::from_array(rows.clone()), &ColumnSelector::Position(0))
                .unwrap();
        assert_eq!(colvar.rows(), &rows);
    }

    #[test]
    fn empty_trajectory() {
        let table = Table::from_reader("#! FIELDS time cv\n".as_bytes(), "COLVAR").unwrap();
        let colvar = Colvar::from_table(table, &ColumnSelector::Position(0)).unwrap();
        assert!(colvar.is_empty());
        assert_eq!(colvar.table().ncols(), 2);
    }
}
