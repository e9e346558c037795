#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Result types for the hotspot and trend operations.
//!
//! These are serialized to JSON for the map front end. Field names are
//! `snake_case` because the front end reads them verbatim (`top_crime`,
//! `rate_of_crime`, `predicted_total_crimes`). Every response is either the
//! success payload or an [`ApiError`] body, distinguished by shape rather
//! than by HTTP status.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;
use strum_macros::Display;

/// Ordinal risk label assigned to a cluster of regions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
)]
pub enum RiskTier {
    /// Cluster with the smallest centroid magnitude.
    Low,
    /// Middle cluster.
    Medium,
    /// Cluster with the largest centroid magnitude.
    High,
}

impl RiskTier {
    /// Tiers in ascending order of magnitude. Also the number of clusters
    /// the hotspot pipeline partitions regions into.
    pub const ALL: &[Self] = &[Self::Low, Self::Medium, Self::High];

    /// The tier for a cluster ranked at `rank` (0 = smallest).
    #[must_use]
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }
}

/// Display color for a region's dominant crime type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Display,
)]
pub enum CrimeColor {
    Red,
    Blue,
    Yellow,
    Green,
    Purple,
    Orange,
    DarkRed,
    Brown,
    Pink,
    LightBlue,
    DarkGreen,
    /// Fallback for labels without an assigned color.
    Gray,
}

/// Normalized crime-type labels with a fixed display color.
const CRIME_COLORS: &[(&str, CrimeColor)] = &[
    ("theft", CrimeColor::Red),
    ("assault", CrimeColor::Blue),
    ("burglary", CrimeColor::Yellow),
    ("vandalism", CrimeColor::Green),
    ("harassment", CrimeColor::Purple),
    ("fraud", CrimeColor::Orange),
    ("murder", CrimeColor::DarkRed),
    ("crime against children", CrimeColor::Purple),
    ("crime against scs", CrimeColor::Brown),
    ("crime against women", CrimeColor::Pink),
    ("crime committed by juveniles", CrimeColor::LightBlue),
    ("economic offences", CrimeColor::DarkGreen),
    ("other", CrimeColor::Gray),
];

impl CrimeColor {
    /// Looks up the color for a normalized crime-type label, falling back to
    /// [`CrimeColor::Gray`].
    #[must_use]
    pub fn for_crime(label: &str) -> Self {
        CRIME_COLORS
            .iter()
            .find(|(name, _)| *name == label)
            .map_or(Self::Gray, |(_, color)| *color)
    }
}

/// One region in the hotspot response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotRecord {
    /// Region name as it appears in the upload.
    pub state: String,
    /// First-seen latitude, `null` if not finite.
    pub latitude: Option<f64>,
    /// First-seen longitude, `null` if not finite.
    pub longitude: Option<f64>,
    /// Risk tier of the region's cluster.
    pub risk: RiskTier,
    /// Raw cluster id (0-2), arbitrary until mapped to [`Self::risk`].
    pub cluster: usize,
    /// Crime type with the highest cumulative count.
    pub top_crime: String,
    /// Display color for [`Self::top_crime`].
    pub crime_color: CrimeColor,
    /// First-seen crime rate, `null` if not finite.
    pub rate_of_crime: Option<f64>,
    /// Cumulative count per crime type. Every label seen anywhere in the
    /// upload is present, zero-filled.
    pub crime_breakdown: BTreeMap<String, u64>,
    /// Total count per year column, keyed by the column header.
    #[serde(flatten)]
    pub years: BTreeMap<String, u64>,
}

/// One year of the trend response.
///
/// Observed years carry `total_crimes`, forecast years carry
/// `predicted_total_crimes`; the other field is `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    /// Calendar year.
    pub year: i32,
    /// Observed total across all regions and crime types.
    pub total_crimes: Option<u64>,
    /// Forecast total, never negative.
    pub predicted_total_crimes: Option<u64>,
}

/// Error body returned in place of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Human-readable failure description.
    pub error: String,
}

/// Either a success payload or an [`ApiError`], serialized without a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed; only the `error` key is present.
    Error(ApiError),
}

impl<T> ApiResponse<T> {
    /// Converts an operation result into a response body.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(e) => Self::error(e),
        }
    }

    /// Builds an error body from any displayable error.
    pub fn error(message: impl Display) -> Self {
        Self::Error(ApiError {
            error: message.to_string(),
        })
    }

    /// Whether this is an error body.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}
