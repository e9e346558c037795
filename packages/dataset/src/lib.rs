#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading and cleaning of uploaded crime statistics tables.
//!
//! Uploaded files are loosely structured: header names vary from one
//! publisher to the next, numeric cells carry thousands separators or
//! footnote markers, and crime-type labels are spelled inconsistently. This
//! crate turns the raw bytes into a [`RawTable`], works out which columns
//! play which role ([`ColumnRoles`]), and provides the cell-level coercions
//! the analysis pipeline relies on.

pub mod columns;
pub mod normalize;
pub mod table;

pub use columns::{ColumnRole, ColumnRoles, YearColumn, resolve_columns, resolve_year_columns};
pub use normalize::{BLANK_CRIME_TYPE, Coerced, coerce_numeric, normalize_crime_type};
pub use table::{RawTable, ensure_csv_file_name, load_csv};

use thiserror::Error;

/// Errors that can occur while loading or interpreting an uploaded table.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The uploaded file name does not end in `.csv`.
    #[error("Please upload a valid CSV file")]
    InvalidFileType,

    /// The bytes could not be interpreted as a delimited table.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The CSV reader rejected the input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No header matched a required column role.
    #[error("Could not find a {role} column in the CSV header")]
    MissingColumn {
        /// The role that could not be resolved.
        role: ColumnRole,
    },
}
