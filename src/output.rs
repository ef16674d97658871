//! Plain-text output of a reweighted surface.
//!
//! One grid point per line, coordinates first and the free energy last, every number printed
//! `%20.12f`. The first CV varies fastest. In 2-D and 3-D a blank line follows every complete
//! sweep of the first CV, which is the block layout gnuplot's `splot` expects.

use crate::errors::*;
use crate::reweight::FreeEnergySurface;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn write_row<W: Write>(writer: &mut W, values: &[f64]) -> io::Result<()> {
    let mut sep = "";
    for value in values {
        write!(writer, "{}{:20.12}", sep, value)?;
        sep = " ";
    }
    writeln!(writer)
}

impl FreeEnergySurface {
    /// Write the surface as a text table
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let axes = self.axes();
        let fes = self.fes();
        match axes {
            [x] => {
                for (nx, &xv) in x.iter().enumerate() {
                    write_row(writer, &[xv, fes[[nx]]])?;
                }
            }
            [x, y] => {
                for (ny, &yv) in y.iter().enumerate() {
                    for (nx, &xv) in x.iter().enumerate() {
                        write_row(writer, &[xv, yv, fes[[nx, ny]]])?;
                    }
                    writeln!(writer)?;
                }
            }
            [x, y, z] => {
                for (nz, &zv) in z.iter().enumerate() {
                    for (ny, &yv) in y.iter().enumerate() {
                        for (nx, &xv) in x.iter().enumerate() {
                            write_row(writer, &[xv, yv, zv, fes[[nx, ny, nz]]])?;
                        }
                        writeln!(writer)?;
                    }
                }
            }
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("cannot write a {}-dimensional surface", axes.len()),
                ))
            }
        }
        Ok(())
    }

    /// Write the surface to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::info!("Saving results on {}", path.display());
        let file = File::create(path).map_err(|e| ReweightError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .map_err(|e| ReweightError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use crate::reweight::Reweighting;
    use ndarray::array;

    fn render(surface: &crate::reweight::FreeEnergySurface) -> String {
        let mut buf = Vec::new();
        surface.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn one_dimensional_layout() {
        let rows = array![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 1.0, 0.0]];
        let surface = Reweighting::builder()
            .kt(1.0)
            .cv_columns(vec![1])
            .bias_columns(vec![2])
            .bounds(vec![(0.0, 2.0)])
            .bins(vec![3])
            .ebetac(vec![1.0].into())
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();

        let text = render(&surface);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("{:20.12} {:20.12}", 0.0, 2f64.ln()));
        assert_eq!(lines[1], format!("{:20.12} {:20.12}", 1.0, 0.0));
        assert_eq!(lines[2], format!("{:20.12} {:>20}", 2.0, "inf"));
        assert_eq!(lines[1].len(), 41);
    }

    #[test]
    fn two_dimensional_blocks() {
        let rows = array![[0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 0.0]];
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

        let text = render(&surface);
        let lines: Vec<&str> = text.lines().collect();
        // Two blocks of two points, each followed by a blank line
        assert_eq!(lines.len(), 6);
        assert!(lines[2].is_empty() && lines[5].is_empty());
        let x_then_y = |line: &str| -> (f64, f64) {
            let mut cols = line.split_whitespace().map(|c| c.parse::<f64>().unwrap());
            (cols.next().unwrap(), cols.next().unwrap())
        };
        assert_eq!(x_then_y(lines[0]), (0.0, 0.0));
        assert_eq!(x_then_y(lines[1]), (1.0, 0.0));
        assert_eq!(x_then_y(lines[3]), (0.0, 1.0));
        assert_eq!(x_then_y(lines[4]), (1.0, 1.0));
    }

    #[test]
    fn three_dimensional_blocks() {
        let rows = array![[0.0, 0.0, 0.0, 0.0, 0.0]];
        let surface = Reweighting::builder()
            .kt(1.0)
            .cv_columns(vec![1, 2, 3])
            .bias_columns(vec![4])
            .bounds(vec![(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)])
            .bins(vec![2, 3, 2])
            .ebetac(vec![1.0].into())
            .build()
            .unwrap()
            .compute(rows.view())
            .unwrap();

        let text = render(&surface);
        let lines: Vec<&str> = text.lines().collect();
        // 2 z slices x 3 y blocks x (2 points + blank line)
        assert_eq!(lines.len(), 18);
        assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 6);
        let first: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first[3].parse::<f64>().unwrap(), 0.0);
        let last: Vec<&str> = lines[16].split_whitespace().collect();
        assert_eq!(last[..3], ["1.000000000000", "1.000000000000", "1.000000000000"]);
        assert_eq!(last[3], "inf");
    }
}
