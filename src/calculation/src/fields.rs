//! Column identifiers of the limits table.
//!
//! Each numeric column of a [`LimitsRecord`] has a canonical table name and a
//! set of short aliases. Lookup is case-insensitive and accepts either form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::limits::LimitsRecord;

/// Canonical name of the profile column.
pub const PROFILE_COLUMN: &str = "Profile";

/// Numeric column of the limits table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// Reynolds number
    Reynolds,
    /// Lift-curve slope per degree
    ClAlphaDeg,
    /// Lift-curve slope per radian
    ClAlphaRad,
    /// Moment coefficient at 0°
    Cm0,
    /// Minimum drag coefficient
    CdMin,
    /// Angle of minimum drag
    AlphaCdMin,
    /// Ideal lift coefficient
    ClI,
    /// Lift-to-drag at ideal lift
    ClCdAtClI,
    /// Maximum lift coefficient
    ClMax,
    /// Angle of maximum lift
    AlphaClMax,
    /// Drag at maximum lift
    CdAtClMax,
    /// Maximum lift-to-drag ratio
    ClCdMax,
    /// Angle of maximum lift-to-drag ratio
    AlphaClCdMax,
}

impl Field {
    /// All fields in table column order.
    pub const ALL: [Field; 13] = [
        Field::Reynolds,
        Field::ClAlphaDeg,
        Field::ClAlphaRad,
        Field::Cm0,
        Field::CdMin,
        Field::AlphaCdMin,
        Field::ClI,
        Field::ClCdAtClI,
        Field::ClMax,
        Field::AlphaClMax,
        Field::CdAtClMax,
        Field::ClCdMax,
        Field::AlphaClCdMax,
    ];

    /// Canonical name and lowercase aliases.
    fn names(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Field::Reynolds => ("Re", &["reynolds"]),
            Field::ClAlphaDeg => ("Cl_alpha (1/deg)", &["cl_alpha_deg", "cla_deg"]),
            Field::ClAlphaRad => (
                "Cl_alpha",
                &["cl_alpha_rad", "cl_alpha (1/rad)", "cla", "cla_rad"],
            ),
            Field::Cm0 => ("Cm_0", &["cm0"]),
            Field::CdMin => ("Cd_min", &["cdmin"]),
            Field::AlphaCdMin => (
                "α @ Cd_min",
                &["alpha_cd_min", "a_cd_min", "alpha @ cd_min"],
            ),
            Field::ClI => ("Cl_i", &["cli", "cl_ideal"]),
            Field::ClCdAtClI => (
                "Cl/Cd @ Cl_i",
                &["cl_cd_cl_i", "clcd_cl_i", "clcd_i", "ld_i"],
            ),
            Field::ClMax => ("Cl_max", &["clmax"]),
            Field::AlphaClMax => (
                "α @ Cl_max",
                &["alpha_cl_max", "a_cl_max", "alpha @ cl_max"],
            ),
            Field::CdAtClMax => ("Cd @ Cl_max", &["cd_cl_max", "cd_at_cl_max"]),
            Field::ClCdMax => ("Cl/Cd_max", &["cl_cd_max", "clcd_max", "ld_max"]),
            Field::AlphaClCdMax => (
                "α @ Cl/Cd_max",
                &["alpha_cl_cd_max", "a_cl_cd_max", "alpha @ cl/cd_max"],
            ),
        }
    }

    /// Canonical column name.
    pub fn canonical(self) -> &'static str {
        self.names().0
    }

    /// Short aliases accepted by [`Field::resolve`].
    pub fn aliases(self) -> &'static [&'static str] {
        self.names().1
    }

    /// Resolve a canonical name or alias, ignoring case.
    pub fn resolve(name: &str) -> Option<Field> {
        let wanted = name.trim().to_lowercase();
        Field::ALL.into_iter().find(|field| {
            let (canonical, aliases) = field.names();
            canonical.to_lowercase() == wanted || aliases.iter().any(|alias| *alias == wanted)
        })
    }

    /// Value of this column in a record. A missing Reynolds number is NaN.
    pub fn value(self, record: &LimitsRecord) -> f64 {
        match self {
            Field::Reynolds => record.reynolds.unwrap_or(f64::NAN),
            Field::ClAlphaDeg => record.cl_alpha_deg,
            Field::ClAlphaRad => record.cl_alpha_rad,
            Field::Cm0 => record.cm_0,
            Field::CdMin => record.cd_min,
            Field::AlphaCdMin => record.alpha_cd_min,
            Field::ClI => record.cl_i,
            Field::ClCdAtClI => record.cl_cd_at_cl_i,
            Field::ClMax => record.cl_max,
            Field::AlphaClMax => record.alpha_cl_max,
            Field::CdAtClMax => record.cd_at_cl_max,
            Field::ClCdMax => record.cl_cd_max,
            Field::AlphaClCdMax => record.alpha_cl_cd_max,
        }
    }

    /// Human-readable list of accepted names, for error messages.
    pub fn valid_names() -> String {
        Field::ALL
            .iter()
            .map(|f| format!("{} ({})", f.canonical(), f.aliases().join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_round_trips_through_its_names() {
        let distinct: std::collections::BTreeSet<Field> = Field::ALL.into_iter().collect();
        assert_eq!(distinct.len(), Field::ALL.len());
        for field in Field::ALL {
            assert!(!field.canonical().is_empty());
            assert_eq!(Field::resolve(field.canonical()), Some(field));
            for alias in field.aliases() {
                assert_eq!(Field::resolve(alias), Some(field), "alias {alias}");
            }
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(Field::resolve("Cl_cd_max"), Some(Field::ClCdMax));
        assert_eq!(Field::resolve("CL/CD_MAX"), Some(Field::ClCdMax));
        assert_eq!(Field::resolve(" cl_i "), Some(Field::ClI));
        assert_eq!(Field::resolve("ALPHA @ CD_MIN"), Some(Field::AlphaCdMin));
    }

    #[test]
    fn test_unknown_and_profile_do_not_resolve() {
        assert_eq!(Field::resolve("lift"), None);
        assert_eq!(Field::resolve(PROFILE_COLUMN), None);
    }

    #[test]
    fn test_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in Field::ALL {
            assert!(seen.insert(field.canonical().to_lowercase()));
            for alias in field.aliases() {
                assert!(seen.insert(alias.to_string()), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn test_names_are_per_field() {
        assert_eq!(Field::AlphaClCdMax.canonical(), "α @ Cl/Cd_max");
        assert_eq!(Field::CdAtClMax.canonical(), "Cd @ Cl_max");
        assert_ne!(Field::CdAtClMax.canonical(), Field::Reynolds.canonical());
        assert_eq!(Field::Cm0.to_string(), "Cm_0");
    }

    #[test]
    fn test_valid_names_lists_everything() {
        let names = Field::valid_names();
        assert!(names.contains("Cl/Cd_max"));
        assert!(names.contains("cl_i") || names.contains("cli"));
    }
}
