//! Whitespace-delimited numeric tables, the common format of FES snapshots, COLVAR files and
//! cached normalization sequences.
//!
//! Lines starting with `#` are comments, except for a PLUMED `#! FIELDS` line, which names the
//! columns that follow. Blank lines are ignored.

use crate::errors::*;
use ndarray::{Array2, ArrayView1, Axis};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Picks a column of a [`Table`], either by its 1-based position or by its `#! FIELDS` name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    /// Zero-based column index
    Position(usize),
    /// Column name as declared in the `#! FIELDS` header
    Name(String),
}

impl FromStr for ColumnSelector {
    type Err = String;

    /// Integers are 1-based column numbers, anything else is a field name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty column selector".to_string());
        }
        match s.parse::<usize>() {
            Ok(0) => Err("column numbers start at 1".to_string()),
            Ok(n) => Ok(Self::Position(n - 1)),
            Err(_) => Ok(Self::Name(s.to_string())),
        }
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(i) => write!(f, "{}", i + 1),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A fully materialised numeric table with optional column names
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    fields: Vec<String>,
    data: Array2<f64>,
}

impl Table {
    /// Wrap an array that did not come from a file
    pub fn from_array(data: Array2<f64>) -> Self {
        Self {
            fields: Vec::new(),
            data,
        }
    }

    /// Wrap an array together with its column names
    pub fn with_fields(fields: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if fields.len() != data.ncols() {
            return Err(ReweightError::ArrayLengthMismatch(fields.len(), data.ncols()));
        }
        Ok(Self { fields, data })
    }

    /// Read a table from a file on disk
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ReweightError::io(path, e))?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Read a table from any buffered reader; `origin` is only used in error messages
    pub fn from_reader<R: BufRead>(reader: R, origin: impl Into<PathBuf>) -> Result<Self> {
        let origin = origin.into();
        let mut fields = Vec::new();
        let mut values = Vec::new();
        let mut ncols = None;
        let mut nrows = 0;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| ReweightError::io(&origin, e))?;
            let line = line.trim();

            if let Some(header) = line.strip_prefix("#!") {
                let mut words = header.split_whitespace();
                if words.next() == Some("FIELDS") {
                    fields = words.map(String::from).collect();
                }
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let before = values.len();
            for token in line.split_whitespace() {
                let value = token.parse::<f64>().map_err(|_| ReweightError::Parse {
                    path: origin.clone(),
                    line: lineno + 1,
                    message: format!("could not parse `{}` as a number", token),
                })?;
                values.push(value);
            }

            let width = values.len() - before;
            match ncols {
                None => ncols = Some(width),
                Some(n) if n != width => {
                    return Err(ReweightError::Parse {
                        path: origin,
                        line: lineno + 1,
                        message: format!("expected {} columns, found {}", n, width),
                    });
                }
                Some(_) => {}
            }
            nrows += 1;
        }

        let ncols = ncols.unwrap_or(fields.len());
        let data =
            Array2::from_shape_vec((nrows, ncols), values).map_err(|e| ReweightError::Parse {
                path: origin.clone(),
                line: 0,
                message: e.to_string(),
            })?;

        // A FIELDS line that does not describe these columns is as good as none
        if !fields.is_empty() && fields.len() != ncols {
            log::warn!(
                "{}: header names {} fields but rows have {} columns; ignoring names",
                origin.display(),
                fields.len(),
                ncols
            );
            fields.clear();
        }

        Ok(Self { fields, data })
    }

    /// Zero-based index of the column picked by `selector`
    pub fn resolve(&self, selector: &ColumnSelector) -> Result<usize> {
        match selector {
            ColumnSelector::Position(i) if *i < self.ncols() => Ok(*i),
            ColumnSelector::Name(name) => self
                .fields
                .iter()
                .position(|field| field == name)
                .ok_or_else(|| ReweightError::MissingColumn(name.clone())),
            _ => Err(ReweightError::MissingColumn(format!(
                "{} (table has {} columns)",
                selector,
                self.ncols()
            ))),
        }
    }

    /// Resolve a list of selectors at once
    pub fn resolve_all(&self, selectors: &[ColumnSelector]) -> Result<Vec<usize>> {
        selectors.iter().map(|s| self.resolve(s)).collect()
    }

    /// A view of one column
    pub fn column(&self, selector: &ColumnSelector) -> Result<ArrayView1<'_, f64>> {
        let i = self.resolve(selector)?;
        Ok(self.data.index_axis(Axis(1), i))
    }

    /// Column names from the `#! FIELDS` header, empty if there was none
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// The table's values, one row per line
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }
}
