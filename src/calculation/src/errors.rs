//! Structured error types for polar analysis.
//!
//! Only configuration and selection problems are errors. A polar file that
//! yields no rows is a normal outcome (see [`crate::polar::ParsedPolar::is_empty`])
//! and a token that is not a number is simply dropped by the parser.

use std::path::Path;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type CalcResult<T> = Result<T, CalcError>;

/// Error type for selection, filtering and table operations.
#[derive(Error, Debug)]
pub enum CalcError {
    /// The file selector matched nothing.
    #[error("No polar files matched selection in '{dir}' (profiles: {profiles}, Re: {reynolds})")]
    NoMatchingFiles {
        dir: String,
        profiles: String,
        reynolds: String,
    },

    /// A filter or sort criterion names an unknown field, operator or operand.
    #[error("Invalid filter {subject} '{value}'. Valid: {valid}")]
    InvalidFilter {
        subject: String,
        value: String,
        valid: String,
    },

    /// File or directory I/O failure.
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// Analysis constants could not be loaded.
    #[error("Config error: {reason}")]
    Config { reason: String },

    /// Failure inside the tabular layer.
    #[error("Table error: {0}")]
    Table(#[from] PolarsError),
}

impl CalcError {
    /// Create a NoMatchingFiles error
    pub fn no_matching_files(dir: &Path, profiles: &[String], reynolds: Option<&str>) -> Self {
        CalcError::NoMatchingFiles {
            dir: dir.display().to_string(),
            profiles: if profiles.is_empty() {
                "all".to_string()
            } else {
                profiles.join(",")
            },
            reynolds: reynolds.unwrap_or("any").to_string(),
        }
    }

    /// Create an InvalidFilter error
    pub fn invalid_filter(
        subject: impl Into<String>,
        value: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        CalcError::InvalidFilter {
            subject: subject.into(),
            value: value.into(),
            valid: valid.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: &Path,
        reason: impl ToString,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a Config error
    pub fn config(reason: impl Into<String>) -> Self {
        CalcError::Config {
            reason: reason.into(),
        }
    }

    /// Short code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::NoMatchingFiles { .. } => "NO_MATCHING_FILES",
            CalcError::InvalidFilter { .. } => "INVALID_FILTER",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::Config { .. } => "CONFIG_ERROR",
            CalcError::Table(_) => "TABLE_ERROR",
        }
    }
}
