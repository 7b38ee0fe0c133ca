//! Analysis constants for polar parsing and figure-of-merit extraction.
//!
//! The defaults reproduce the reference behavior exactly. They can be
//! overridden from a JSON file; keys that are absent keep their default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Global constants for the polar analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    /// Lower bound of the lift-curve fitting window (deg, inclusive)
    pub linear_alpha_min: f64,

    /// Upper bound of the lift-curve fitting window (deg, inclusive)
    pub linear_alpha_max: f64,

    /// Minimum number of numeric tokens a data line needs to become a row.
    /// Lines with only `alpha CL CD CDp` are dropped, unlike the fallback reader.
    pub min_numeric_tokens: usize,

    /// Lines between the column header and the first data line
    /// (header, dashed separator, data)
    pub data_offset: usize,

    /// Compact Reynolds tags below this value are fractions of a million
    pub compact_re_threshold: f64,

    /// Multiplier applied to compact Reynolds tags below the threshold
    pub compact_re_scale: f64,
}

impl Constants {
    /// Create a new Constants instance with default values.
    pub const fn new() -> Self {
        Self {
            linear_alpha_min: -2.0,
            linear_alpha_max: 5.0,
            min_numeric_tokens: 5,
            data_offset: 2,
            compact_re_threshold: 1000.0,
            compact_re_scale: 1e6,
        }
    }

    /// Load constants from a JSON file.
    pub fn from_json_file(path: &Path) -> CalcResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CalcError::file_error("read config", path, e))?;
        Self::from_json_str(&text)
    }

    /// Parse constants from JSON text.
    pub fn from_json_str(text: &str) -> CalcResult<Self> {
        let constants: Self =
            serde_json::from_str(text).map_err(|e| CalcError::config(e.to_string()))?;
        constants.validate()?;
        Ok(constants)
    }

    fn validate(&self) -> CalcResult<()> {
        if !(self.linear_alpha_min <= self.linear_alpha_max) {
            return Err(CalcError::config(format!(
                "linear window [{}, {}] is empty",
                self.linear_alpha_min, self.linear_alpha_max
            )));
        }
        if self.min_numeric_tokens < 3 {
            return Err(CalcError::config(
                "min_numeric_tokens must cover at least alpha, CL and CD",
            ));
        }
        Ok(())
    }

    /// Convert a compact Reynolds tag (`Re0.688`) to a Reynolds number.
    pub fn expand_compact_re(&self, value: f64) -> f64 {
        if value < self.compact_re_threshold {
            value * self.compact_re_scale
        } else {
            value
        }
    }

    /// Is `alpha` inside the lift-curve fitting window?
    #[inline]
    pub fn in_linear_window(&self, alpha: f64) -> bool {
        alpha >= self.linear_alpha_min && alpha <= self.linear_alpha_max
    }
}

impl Default for Constants {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical column names of the polar row table.
pub mod columns {
    /// Angle of attack (deg)
    pub const ALPHA: &str = "alpha";
    /// Lift coefficient
    pub const CL: &str = "CL";
    /// Drag coefficient
    pub const CD: &str = "CD";
    /// Pressure drag coefficient
    pub const CDP: &str = "CDp";
    /// Pitching moment coefficient
    pub const CM: &str = "Cm";
    /// Lift-to-drag ratio
    pub const CL_CD: &str = "Cl_Cd";

    /// All columns in table order.
    pub const ALL: [&str; 6] = [ALPHA, CL, CD, CDP, CM, CL_CD];
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_constants() {
        let c = Constants::new();
        assert_eq!(c.linear_alpha_min, -2.0);
        assert_eq!(c.linear_alpha_max, 5.0);
        assert_eq!(c.min_numeric_tokens, 5);
        assert_eq!(c.data_offset, 2);
        assert_eq!(c, Constants::default());
    }

    #[test]
    fn test_compact_re() {
        let c = Constants::new();
        assert_relative_eq!(c.expand_compact_re(0.688), 688_000.0, epsilon = 1e-6);
        assert_relative_eq!(c.expand_compact_re(150_000.0), 150_000.0);
    }

    #[test]
    fn test_linear_window_inclusive() {
        let c = Constants::new();
        assert!(c.in_linear_window(-2.0));
        assert!(c.in_linear_window(5.0));
        assert!(!c.in_linear_window(5.25));
        assert!(!c.in_linear_window(f64::NAN));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c = Constants::from_json_str(r#"{ "linear_alpha_max": 4.0 }"#).unwrap();
        assert_eq!(c.linear_alpha_max, 4.0);
        assert_eq!(c.linear_alpha_min, -2.0);
        assert_eq!(c.min_numeric_tokens, 5);
    }

    #[test]
    fn test_invalid_json_config() {
        assert!(Constants::from_json_str("{ not json").is_err());
        let err = Constants::from_json_str(r#"{ "linear_alpha_min": 6.0 }"#).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
