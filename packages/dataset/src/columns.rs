//! Header sniffing.
//!
//! Publishers name the same column many ways ("State/UT", "States/UTs",
//! "STATE"), so roles are assigned by case-insensitive substring rules
//! evaluated in a fixed order. When several headers satisfy a rule, the
//! left-most one wins.

use std::collections::BTreeMap;

use strum_macros::Display;

use crate::DatasetError;

/// Semantic role a column can play in a crime statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColumnRole {
    /// Grouping key (state or union territory name).
    Region,
    /// Latitude of the region.
    Latitude,
    /// Longitude of the region.
    Longitude,
    /// Published crime rate.
    Rate,
    /// Crime category label.
    CrimeType,
}

impl ColumnRole {
    /// Required roles in resolution order.
    pub const ALL: &[Self] = &[
        Self::Region,
        Self::Latitude,
        Self::Longitude,
        Self::Rate,
        Self::CrimeType,
    ];

    /// Whether a lowercased header name satisfies this role's rule.
    #[must_use]
    pub fn matches(self, lower: &str) -> bool {
        match self {
            Self::Region => lower.contains("state") || lower.contains("uts"),
            Self::Latitude => lower.contains("lat"),
            Self::Longitude => lower.contains("lon"),
            Self::Rate => lower.contains("rate"),
            // Also covers the "Type of Crimes" spelling.
            Self::CrimeType => lower.contains("crime") && lower.contains("type"),
        }
    }
}

/// One calendar year of counts, possibly spread over several columns whose
/// headers name the same year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearColumn {
    /// The year the column holds counts for.
    pub year: i32,
    /// Header text of the first column for this year, used as the output key.
    pub name: String,
    /// Indices of every column holding this year.
    pub indices: Vec<usize>,
}

/// Resolved column indices for every role the hotspot pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    /// Region (grouping key) column.
    pub region: usize,
    /// Latitude column.
    pub latitude: usize,
    /// Longitude column.
    pub longitude: usize,
    /// Crime rate column.
    pub rate: usize,
    /// Crime type column.
    pub crime_type: usize,
    /// Year columns, ascending by year. May be empty.
    pub years: Vec<YearColumn>,
}

/// Resolves every required role plus the year columns.
///
/// # Errors
///
/// Returns [`DatasetError::MissingColumn`] naming the first required role
/// that no header matches.
pub fn resolve_columns(headers: &[String]) -> Result<ColumnRoles, DatasetError> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let find = |role: ColumnRole| {
        lowered
            .iter()
            .position(|h| role.matches(h))
            .ok_or(DatasetError::MissingColumn { role })
    };

    let roles = ColumnRoles {
        region: find(ColumnRole::Region)?,
        latitude: find(ColumnRole::Latitude)?,
        longitude: find(ColumnRole::Longitude)?,
        rate: find(ColumnRole::Rate)?,
        crime_type: find(ColumnRole::CrimeType)?,
        years: resolve_year_columns(headers),
    };

    for role in ColumnRole::ALL {
        log::debug!("Resolved {role} column: {:?}", headers[roles.index(*role)]);
    }
    log::debug!(
        "Resolved year columns: {:?}",
        roles.years.iter().map(|y| y.year).collect::<Vec<_>>()
    );

    Ok(roles)
}

impl ColumnRoles {
    /// Column index resolved for a required role.
    #[must_use]
    pub const fn index(&self, role: ColumnRole) -> usize {
        match role {
            ColumnRole::Region => self.region,
            ColumnRole::Latitude => self.latitude,
            ColumnRole::Longitude => self.longitude,
            ColumnRole::Rate => self.rate,
            ColumnRole::CrimeType => self.crime_type,
        }
    }
}

/// Collects the columns whose trimmed header is made only of ASCII digits,
/// grouped by year and sorted ascending.
///
/// Digit strings too long to be a year are ignored.
#[must_use]
pub fn resolve_year_columns(headers: &[String]) -> Vec<YearColumn> {
    let mut by_year: BTreeMap<i32, YearColumn> = BTreeMap::new();

    for (index, header) in headers.iter().enumerate() {
        let trimmed = header.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(year) = trimmed.parse::<i32>() else {
            log::warn!("Ignoring numeric header {trimmed:?}: not a representable year");
            continue;
        };

        by_year
            .entry(year)
            .or_insert_with(|| YearColumn {
                year,
                name: trimmed.to_owned(),
                indices: Vec::new(),
            })
            .indices
            .push(index);
    }

    by_year.into_values().collect()
}
