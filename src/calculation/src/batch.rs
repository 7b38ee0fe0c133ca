//! Multi-file analysis.
//!
//! Files are parsed in parallel. A file that cannot be read or yields no
//! table is logged, counted and skipped; it never aborts the batch. Results
//! are ordered by profile name whatever order the workers finish in.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::constants::Constants;
use crate::errors::CalcResult;
use crate::filter::Criterion;
use crate::limits::{
    AngleSample, LimitsRecord, PolarExtrema, column_extrema, compute_limits_with, values_at,
};
use crate::parser::parse_polar_file_or_empty;
use crate::polar::ParsedPolar;
use crate::selector::{Selection, select_files};
use crate::table::limits_frame;

/// Outcome of a limits batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One record per non-empty file, stably sorted by profile
    pub records: Vec<LimitsRecord>,
    /// Source file of each record, same order as `records`
    pub sources: Vec<PathBuf>,
    /// Files that produced no rows, in file-name order
    pub empty_files: Vec<PathBuf>,
    /// Number of files selected
    pub total_files: usize,
}

impl BatchReport {
    /// `"N of M files empty"`.
    pub fn summary(&self) -> String {
        format!("{} of {} files empty", self.empty_files.len(), self.total_files)
    }

    /// Aggregate limits table.
    pub fn frame(&self) -> PolarsResult<DataFrame> {
        limits_frame(&self.records)
    }

    /// Source files whose limits satisfy every criterion.
    ///
    /// Keyed by file, so one profile at several Reynolds numbers passes or
    /// fails per polar.
    pub fn passing_files(&self, criteria: &[Criterion]) -> BTreeSet<PathBuf> {
        self.records
            .iter()
            .zip(&self.sources)
            .filter(|(record, _)| criteria.iter().all(|c| c.matches(record)))
            .map(|(_, path)| path.clone())
            .collect()
    }
}

/// Result computed from one polar file.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry<T> {
    /// Source file
    pub path: PathBuf,
    /// Profile name
    pub profile: String,
    /// Reynolds number of the polar, when known
    pub reynolds: Option<f64>,
    /// Computed result
    pub value: T,
}

impl<T> BatchEntry<T> {
    /// Unique label of the entry: the file stem.
    pub fn label(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.profile.clone())
    }
}

/// Per-file results of a batch, sorted by profile name.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// One entry per non-empty file
    pub entries: Vec<BatchEntry<T>>,
    /// Files skipped for having no rows
    pub empty_files: Vec<PathBuf>,
    /// Number of files selected
    pub total_files: usize,
}

impl<T> Batch<T> {
    /// `"N of M files empty"`.
    pub fn summary(&self) -> String {
        format!("{} of {} files empty", self.empty_files.len(), self.total_files)
    }

    /// Keep only the entries whose source file is in `files`.
    pub fn retain_files(&mut self, files: &BTreeSet<PathBuf>) {
        self.entries.retain(|entry| files.contains(&entry.path));
    }
}

/// Parse the selected files of `dir` and apply `summarise` to each non-empty one.
pub fn run_batch<T, F>(
    dir: &Path,
    selection: &Selection,
    constants: &Constants,
    summarise: F,
) -> CalcResult<Batch<T>>
where
    T: Send,
    F: Fn(&ParsedPolar) -> Option<T> + Sync,
{
    let files = select_files(dir, selection)?;
    let total_files = files.len();

    let outcomes: Vec<(PathBuf, Option<BatchEntry<T>>)> = files
        .par_iter()
        .map(|path| {
            let parsed = parse_polar_file_or_empty(path, constants);
            let entry = summarise(&parsed).map(|value| BatchEntry {
                path: path.clone(),
                profile: parsed.name,
                reynolds: parsed.reynolds,
                value,
            });
            (path.clone(), entry)
        })
        .collect();

    let mut entries = Vec::with_capacity(total_files);
    let mut empty_files = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Some(entry) => entries.push(entry),
            None => {
                warn!(path = %path.display(), "no data rows, skipping");
                empty_files.push(path);
            }
        }
    }
    // stable: equal names keep file-name order
    entries.sort_by(|a, b| a.profile.cmp(&b.profile));

    let batch = Batch {
        entries,
        empty_files,
        total_files,
    };
    info!(
        dir = %dir.display(),
        profiles = batch.entries.len(),
        "{}",
        batch.summary()
    );
    Ok(batch)
}

/// Limits of every selected file.
pub fn analyze(dir: &Path, selection: &Selection, constants: &Constants) -> CalcResult<BatchReport> {
    let batch = run_batch(dir, selection, constants, |parsed| {
        compute_limits_with(parsed, constants)
    })?;
    let (records, sources) = batch
        .entries
        .into_iter()
        .map(|entry| (entry.value, entry.path))
        .unzip();
    Ok(BatchReport {
        records,
        sources,
        empty_files: batch.empty_files,
        total_files: batch.total_files,
    })
}

/// Nearest rows at `alphas` for every selected file.
pub fn extract_values(
    dir: &Path,
    selection: &Selection,
    alphas: &[f64],
    constants: &Constants,
) -> CalcResult<Batch<Vec<AngleSample>>> {
    run_batch(dir, selection, constants, |parsed| {
        (!parsed.is_empty()).then(|| values_at(parsed, alphas))
    })
}

/// Column ranges of every selected file.
pub fn extrema(
    dir: &Path,
    selection: &Selection,
    constants: &Constants,
) -> CalcResult<Batch<PolarExtrema>> {
    run_batch(dir, selection, constants, column_extrema)
}
