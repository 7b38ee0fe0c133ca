//! Figures of merit extracted from a polar.
//!
//! All extremum searches scan the rows in ascending-angle order and keep the
//! first row on ties. NaN values never win a comparison.

use serde::{Deserialize, Serialize};

use crate::constants::Constants;
use crate::fit::linear_slope;
use crate::polar::{ParsedPolar, PolarRow, lift_to_drag};

/// Per-profile summary of a polar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsRecord {
    /// Profile name
    pub profile: String,
    /// Reynolds number, when the file carried one
    pub reynolds: Option<f64>,
    /// Lift-curve slope (1/deg)
    pub cl_alpha_deg: f64,
    /// Lift-curve slope (1/rad)
    pub cl_alpha_rad: f64,
    /// Moment coefficient at the angle nearest to 0°
    pub cm_0: f64,
    /// Minimum drag coefficient
    pub cd_min: f64,
    /// Angle of minimum drag (deg)
    pub alpha_cd_min: f64,
    /// Ideal lift coefficient (CL at minimum drag)
    pub cl_i: f64,
    /// Lift-to-drag ratio at the ideal lift point
    pub cl_cd_at_cl_i: f64,
    /// Maximum lift coefficient
    pub cl_max: f64,
    /// Angle of maximum lift (deg)
    pub alpha_cl_max: f64,
    /// Drag coefficient at maximum lift
    pub cd_at_cl_max: f64,
    /// Maximum lift-to-drag ratio
    pub cl_cd_max: f64,
    /// Angle of maximum lift-to-drag ratio (deg)
    pub alpha_cl_cd_max: f64,
}

/// Stable arg-extremum over `rows`. `better(candidate, best)` decides replacement.
fn arg_extreme<F, B>(rows: &[PolarRow], key: F, better: B) -> Option<&PolarRow>
where
    F: Fn(&PolarRow) -> f64,
    B: Fn(f64, f64) -> bool,
{
    let mut best: Option<(&PolarRow, f64)> = None;
    for row in rows {
        let value = key(row);
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if !better(value, current) => {}
            _ => best = Some((row, value)),
        }
    }
    best.map(|(row, _)| row)
}

/// First row with the smallest `key`.
pub fn arg_min<F: Fn(&PolarRow) -> f64>(rows: &[PolarRow], key: F) -> Option<&PolarRow> {
    arg_extreme(rows, key, |v, best| v < best)
}

/// First row with the largest `key`.
pub fn arg_max<F: Fn(&PolarRow) -> f64>(rows: &[PolarRow], key: F) -> Option<&PolarRow> {
    arg_extreme(rows, key, |v, best| v > best)
}

/// Row whose angle is closest to `target_alpha`.
///
/// Equidistant rows resolve to the smaller angle. `None` only for an empty
/// slice.
pub fn nearest(rows: &[PolarRow], target_alpha: f64) -> Option<&PolarRow> {
    arg_min(rows, |r| (r.alpha - target_alpha).abs()).or_else(|| rows.first())
}

/// Lift-curve slope over the linear window, as `(per_deg, per_rad)`.
///
/// NaN for both when fewer than two rows fall in the window or the fit is
/// degenerate.
pub fn lift_slope(rows: &[PolarRow], constants: &Constants) -> (f64, f64) {
    let (alphas, cls): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter(|r| constants.in_linear_window(r.alpha))
        .map(|r| (r.alpha, r.cl))
        .unzip();
    if alphas.len() < 2 {
        return (f64::NAN, f64::NAN);
    }
    let alphas_rad: Vec<f64> = alphas.iter().map(|a| a.to_radians()).collect();

    let per_deg = linear_slope(&alphas, &cls).unwrap_or(f64::NAN);
    let per_rad = linear_slope(&alphas_rad, &cls).unwrap_or(f64::NAN);
    (per_deg, per_rad)
}

/// Summarise a polar with the default constants.
pub fn compute_limits(parsed: &ParsedPolar) -> Option<LimitsRecord> {
    compute_limits_with(parsed, &Constants::new())
}

/// Summarise a polar. Returns `None` for an empty table.
pub fn compute_limits_with(parsed: &ParsedPolar, constants: &Constants) -> Option<LimitsRecord> {
    let rows = &parsed.rows;
    if rows.is_empty() {
        return None;
    }

    let (cd_min, alpha_cd_min, cl_i, cl_cd_at_cl_i) = match arg_min(rows, |r| r.cd) {
        Some(r) => (r.cd, r.alpha, r.cl, lift_to_drag(r.cl, r.cd)),
        None => (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
    };
    let (cl_max, alpha_cl_max, cd_at_cl_max) = match arg_max(rows, |r| r.cl) {
        Some(r) => (r.cl, r.alpha, r.cd),
        None => (f64::NAN, f64::NAN, f64::NAN),
    };
    let (cl_cd_max, alpha_cl_cd_max) = match arg_max(rows, PolarRow::cl_cd) {
        Some(r) => (r.cl_cd(), r.alpha),
        None => (f64::NAN, f64::NAN),
    };
    let cm_0 = nearest(rows, 0.0).map_or(f64::NAN, |r| r.cm);
    let (cl_alpha_deg, cl_alpha_rad) = lift_slope(rows, constants);

    Some(LimitsRecord {
        profile: parsed.name.clone(),
        reynolds: parsed.reynolds,
        cl_alpha_deg,
        cl_alpha_rad,
        cm_0,
        cd_min,
        alpha_cd_min,
        cl_i,
        cl_cd_at_cl_i,
        cl_max,
        alpha_cl_max,
        cd_at_cl_max,
        cl_cd_max,
        alpha_cl_cd_max,
    })
}

/// Nearest row to a requested angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleSample {
    /// Requested angle (deg)
    pub target: f64,
    /// Row closest to the requested angle
    pub row: PolarRow,
}

impl AngleSample {
    /// Lift-to-drag ratio of the sampled row.
    pub fn cl_cd(&self) -> f64 {
        self.row.cl_cd()
    }
}

/// Nearest rows for each requested angle. Empty for an empty polar.
pub fn values_at(parsed: &ParsedPolar, alphas: &[f64]) -> Vec<AngleSample> {
    alphas
        .iter()
        .filter_map(|&target| {
            nearest(&parsed.rows, target).map(|row| AngleSample { target, row: *row })
        })
        .collect()
}

/// Minimum and maximum of one column, ignoring NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnRange {
    /// Smallest value
    pub min: f64,
    /// Largest value
    pub max: f64,
}

impl ColumnRange {
    fn of<F: Fn(&PolarRow) -> f64>(rows: &[PolarRow], key: F) -> Self {
        Self {
            min: arg_min(rows, &key).map_or(f64::NAN, |r| key(r)),
            max: arg_max(rows, &key).map_or(f64::NAN, |r| key(r)),
        }
    }
}

/// Ranges of the coefficient columns of one polar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarExtrema {
    /// Lift coefficient range
    #[serde(rename = "CL")]
    pub cl: ColumnRange,
    /// Drag coefficient range
    #[serde(rename = "CD")]
    pub cd: ColumnRange,
    /// Moment coefficient range
    #[serde(rename = "Cm")]
    pub cm: ColumnRange,
    /// Lift-to-drag range
    #[serde(rename = "Cl_Cd")]
    pub cl_cd: ColumnRange,
}

/// Column ranges of a polar. `None` for an empty table.
pub fn column_extrema(parsed: &ParsedPolar) -> Option<PolarExtrema> {
    let rows = &parsed.rows;
    if rows.is_empty() {
        return None;
    }
    Some(PolarExtrema {
        cl: ColumnRange::of(rows, |r| r.cl),
        cd: ColumnRange::of(rows, |r| r.cd),
        cm: ColumnRange::of(rows, |r| r.cm),
        cl_cd: ColumnRange::of(rows, PolarRow::cl_cd),
    })
}
