//! Cell-level cleaning.
//!
//! Numeric cells are coerced leniently: anything that cannot be read as a
//! number becomes `0.0` rather than failing the upload. Crime-type labels
//! are folded to a canonical key so that differently spelled rows land in
//! the same bucket.

use std::sync::LazyLock;

use regex::Regex;

/// Everything that is not a digit or a decimal point.
static NON_NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.]+").expect("valid regex"));

/// Runs of whitespace.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Known misspellings in published crime-type labels, applied after
/// lowercasing and whitespace folding.
const LABEL_TYPOS: &[(&str, &str)] = &[("crime commited", "crime committed")];

/// Label used when a crime-type cell is blank.
pub const BLANK_CRIME_TYPE: &str = "other";

/// Outcome of coercing a cell to a number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced {
    /// The cleaned cell parsed as this value.
    Parsed(f64),
    /// Nothing parseable remained; the cell counts as zero.
    Defaulted,
}

impl Coerced {
    /// The numeric value, `0.0` when defaulted.
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Parsed(v) => v,
            Self::Defaulted => 0.0,
        }
    }

    /// Whether the cell fell back to zero.
    #[must_use]
    pub const fn is_defaulted(self) -> bool {
        matches!(self, Self::Defaulted)
    }
}

/// Coerces a cell to a number by keeping only digits and `.` characters.
///
/// Signs, separators, units and footnote markers are dropped, so `"1,234"`
/// reads as `1234.0` and `"-5"` as `5.0`. Empty or unparseable leftovers
/// (`"n/a"`, `"1.2.3"`) yield [`Coerced::Defaulted`]. Never fails.
#[must_use]
pub fn coerce_numeric(cell: &str) -> Coerced {
    let cleaned = NON_NUMERIC_RE.replace_all(cell, "");
    if cleaned.is_empty() {
        return Coerced::Defaulted;
    }
    cleaned
        .parse::<f64>()
        .map_or(Coerced::Defaulted, Coerced::Parsed)
}

/// Folds a crime-type label to its grouping key.
///
/// Trims, lowercases, collapses whitespace runs to single spaces and fixes
/// known typos. Idempotent. A blank label becomes [`BLANK_CRIME_TYPE`].
#[must_use]
pub fn normalize_crime_type(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        return BLANK_CRIME_TYPE.to_owned();
    }

    let mut label = WHITESPACE_RE.replace_all(&lower, " ").into_owned();
    for &(typo, fixed) in LABEL_TYPOS {
        if label.contains(typo) {
            label = label.replace(typo, fixed);
        }
    }
    label
}
