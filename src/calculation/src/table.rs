//! Aggregate tables and CSV export.
//!
//! The limits of many profiles form one DataFrame with a `Profile` column and
//! one column per [`Field`], named canonically. Extraction results at
//! requested angles form a long table with one row per polar and angle.

use std::cmp::Ordering;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use polars::prelude::*;

use crate::batch::BatchEntry;
use crate::constants::columns;
use crate::errors::{CalcError, CalcResult};
use crate::fields::{Field, PROFILE_COLUMN};
use crate::filter::{Criterion, combined_expr};
use crate::limits::{AngleSample, LimitsRecord};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Sort column of the limits table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    /// Profile name
    Profile,
    /// A numeric field
    Field(Field),
}

/// Column plus direction, parsed from `Cd_min` or `-Cl/Cd_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    /// Column to sort by
    pub column: SortColumn,
    /// Largest first when set
    pub descending: bool,
}

impl SortKey {
    /// Parse a sort key; a leading `-` sorts descending.
    pub fn parse(spec: &str) -> CalcResult<Self> {
        let spec = spec.trim();
        let (descending, name) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest.trim()),
            None => (false, spec),
        };
        let column = if name.eq_ignore_ascii_case(PROFILE_COLUMN) {
            SortColumn::Profile
        } else {
            let field = Field::resolve(name).ok_or_else(|| {
                CalcError::invalid_filter(
                    "sort column",
                    name,
                    format!("{PROFILE_COLUMN}; {}", Field::valid_names()),
                )
            })?;
            SortColumn::Field(field)
        };
        Ok(Self { column, descending })
    }

    fn compare(&self, a: &LimitsRecord, b: &LimitsRecord) -> Ordering {
        match self.column {
            SortColumn::Profile => {
                let ord = a.profile.cmp(&b.profile);
                if self.descending { ord.reverse() } else { ord }
            }
            SortColumn::Field(field) => {
                let (x, y) = (field.value(a), field.value(b));
                // NaN sorts last in either direction
                match (x.is_nan(), y.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let ord = x.total_cmp(&y);
                        if self.descending { ord.reverse() } else { ord }
                    }
                }
            }
        }
    }
}

/// Stable sort of records by a key.
pub fn sort_records(records: &mut [LimitsRecord], key: &SortKey) {
    records.sort_by(|a, b| key.compare(a, b));
}

/// Build the limits DataFrame, columns in [`Field::ALL`] order after `Profile`.
pub fn limits_frame(records: &[LimitsRecord]) -> PolarsResult<DataFrame> {
    let mut series = Vec::with_capacity(Field::ALL.len() + 1);
    let profiles: Vec<&str> = records.iter().map(|r| r.profile.as_str()).collect();
    series.push(Series::new(PROFILE_COLUMN, profiles));
    for field in Field::ALL {
        let values: Vec<f64> = records.iter().map(|r| field.value(r)).collect();
        series.push(Series::new(field.canonical(), values));
    }
    DataFrame::new(series)
}

/// Keep the rows of a limits DataFrame that satisfy every criterion.
pub fn filter_frame(df: DataFrame, criteria: &[Criterion]) -> PolarsResult<DataFrame> {
    match combined_expr(criteria) {
        Some(predicate) => df.lazy().filter(predicate).collect(),
        None => Ok(df),
    }
}

/// Long table of nearest-angle samples, one row per polar and target.
pub fn samples_frame(entries: &[BatchEntry<Vec<AngleSample>>]) -> PolarsResult<DataFrame> {
    let flat: Vec<(&BatchEntry<Vec<AngleSample>>, &AngleSample)> = entries
        .iter()
        .flat_map(|entry| entry.value.iter().map(move |s| (entry, s)))
        .collect();
    let column = |f: fn(&AngleSample) -> f64| -> Vec<f64> { flat.iter().map(|(_, s)| f(s)).collect() };

    DataFrame::new(vec![
        Series::new(PROFILE_COLUMN, flat.iter().map(|(e, _)| e.profile.as_str()).collect::<Vec<_>>()),
        Series::new(
            Field::Reynolds.canonical(),
            flat.iter().map(|(e, _)| e.reynolds).collect::<Vec<_>>(),
        ),
        Series::new("Alpha_target", column(|s| s.target)),
        Series::new(columns::ALPHA, column(|s| s.row.alpha)),
        Series::new(columns::CL, column(|s| s.row.cl)),
        Series::new(columns::CD, column(|s| s.row.cd)),
        Series::new(columns::CDP, column(|s| s.row.cdp)),
        Series::new(columns::CM, column(|s| s.row.cm)),
        Series::new(columns::CL_CD, column(AngleSample::cl_cd)),
    ])
}

/// Write a DataFrame as CSV with a UTF-8 byte order mark.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> CalcResult<()> {
    let mut file = File::create(path).map_err(|e| CalcError::file_error("create", path, e))?;
    file.write_all(UTF8_BOM)
        .map_err(|e| CalcError::file_error("write", path, e))?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;
    Ok(())
}
