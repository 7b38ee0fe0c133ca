//! Airfoil polar analysis library for XFLR5 exports.
//!
//! This library provides:
//! - A tolerant parser for XFLR5 polar text files
//! - Figure-of-merit extraction (lift slope, minimum drag, maximum lift, best glide)
//! - Nearest-angle lookup and per-column extrema
//! - Field filters and sorting over the aggregate limits table
//! - File selection by profile name and Reynolds number
//!
//! # Features
//!
//! - **Tolerant**: malformed files parse to an empty polar instead of failing
//! - **Tabular**: aggregate results are polars `DataFrame`s, exportable to CSV
//! - **Parallel**: batches are parsed on a rayon pool with deterministic output order

#![warn(missing_docs)]
#![warn(clippy::doc_markdown)]

pub mod batch;
pub mod constants;
pub mod errors;
pub mod fields;
pub mod filter;
pub mod fit;
pub mod limits;
pub mod parser;
pub mod polar;
pub mod selector;
pub mod table;

// Re-export key types and functions for easy use
pub use batch::{Batch, BatchEntry, BatchReport, analyze, extract_values, extrema};
pub use constants::Constants;
pub use errors::{CalcError, CalcResult};
pub use fields::{Field, PROFILE_COLUMN};
pub use filter::{Comparison, Criterion, Operand, Operator, Predicate, filter};
pub use limits::{AngleSample, LimitsRecord, PolarExtrema, column_extrema, compute_limits, nearest, values_at};
pub use parser::{parse_polar_file, parse_polar_file_or_empty, parse_polar_text};
pub use polar::{ParsedPolar, PolarRow};
pub use selector::{Inventory, Selection, inventory, list_available_re, reynolds_values, select_files};
pub use table::{SortKey, filter_frame, limits_frame, samples_frame, sort_records, write_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
