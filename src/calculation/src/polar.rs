//! Polar table types.
//!
//! A [`ParsedPolar`] is the parser's output for one file: the profile name,
//! an optional Reynolds number and the rows sorted by angle of attack.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::columns;

/// One angle-of-attack sample of a polar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarRow {
    /// Angle of attack (deg)
    pub alpha: f64,
    /// Lift coefficient
    #[serde(rename = "CL")]
    pub cl: f64,
    /// Drag coefficient
    #[serde(rename = "CD")]
    pub cd: f64,
    /// Pressure drag coefficient, NaN when unavailable
    #[serde(rename = "CDp")]
    pub cdp: f64,
    /// Pitching moment coefficient, NaN when unavailable
    #[serde(rename = "Cm")]
    pub cm: f64,
}

impl PolarRow {
    /// Create a new row.
    pub const fn new(alpha: f64, cl: f64, cd: f64, cdp: f64, cm: f64) -> Self {
        Self {
            alpha,
            cl,
            cd,
            cdp,
            cm,
        }
    }

    /// Lift-to-drag ratio. NaN when `CD == 0`.
    #[inline]
    pub fn cl_cd(&self) -> f64 {
        lift_to_drag(self.cl, self.cd)
    }
}

/// `cl / cd`, mapping a zero drag to NaN instead of an infinity.
#[inline]
pub fn lift_to_drag(cl: f64, cd: f64) -> f64 {
    if cd == 0.0 { f64::NAN } else { cl / cd }
}

/// A parsed polar file.
///
/// `rows` is sorted ascending by `alpha` and may be empty: an empty table is
/// how the parser reports a file it could not read a table from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPolar {
    /// Source file
    pub path: PathBuf,
    /// Profile name from the header, or the file stem
    pub name: String,
    /// Reynolds number, informational only
    pub reynolds: Option<f64>,
    /// Rows sorted by angle of attack
    pub rows: Vec<PolarRow>,
}

impl ParsedPolar {
    /// Build a polar, sorting `rows` by angle of attack.
    pub fn new(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        reynolds: Option<f64>,
        mut rows: Vec<PolarRow>,
    ) -> Self {
        // stable, so equal angles keep file order
        rows.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        Self {
            path: path.as_ref().to_path_buf(),
            name: name.into(),
            reynolds,
            rows,
        }
    }

    /// True when no row could be parsed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Iterator over angles of attack.
    pub fn alphas(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.alpha)
    }

    /// Render the rows as a DataFrame with a derived `Cl_Cd` column.
    ///
    /// An empty polar renders as a frame with no columns.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        if self.rows.is_empty() {
            return Ok(DataFrame::default());
        }
        let column = |f: fn(&PolarRow) -> f64| -> Vec<f64> { self.rows.iter().map(f).collect() };
        DataFrame::new(vec![
            Series::new(columns::ALPHA, column(|r| r.alpha)),
            Series::new(columns::CL, column(|r| r.cl)),
            Series::new(columns::CD, column(|r| r.cd)),
            Series::new(columns::CDP, column(|r| r.cdp)),
            Series::new(columns::CM, column(|r| r.cm)),
            Series::new(columns::CL_CD, column(PolarRow::cl_cd)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> ParsedPolar {
        ParsedPolar::new(
            "sample.txt",
            "NACA 2412",
            Some(688_000.0),
            vec![
                PolarRow::new(2.0, 0.45, 0.0070, 0.0020, -0.050),
                PolarRow::new(-1.0, 0.12, 0.0065, 0.0015, -0.048),
                PolarRow::new(0.0, 0.23, 0.0000, 0.0016, -0.049),
            ],
        )
    }

    #[test]
    fn test_rows_sorted_on_construction() {
        let polar = sample();
        let alphas: Vec<f64> = polar.alphas().collect();
        assert_eq!(alphas, vec![-1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_cl_cd_zero_drag_is_nan() {
        let polar = sample();
        assert!(polar.rows[1].cl_cd().is_nan());
        assert_relative_eq!(polar.rows[2].cl_cd(), 0.45 / 0.0070);
        assert!(polar.rows.iter().all(|r| !r.cl_cd().is_infinite()));
    }

    #[test]
    fn test_to_frame_columns() {
        let df = sample().to_frame().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.get_column_names(), columns::ALL.to_vec());
        let alpha: Vec<f64> = df
            .column(columns::ALPHA)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(alpha, vec![-1.0, 0.0, 2.0]);
    }

    #[test]
    fn test_empty_frame() {
        let polar = ParsedPolar::new("empty.txt", "empty", None, Vec::new());
        assert!(polar.is_empty());
        let df = polar.to_frame().unwrap();
        assert_eq!(df.width(), 0);
        assert_eq!(df.height(), 0);
    }
}
