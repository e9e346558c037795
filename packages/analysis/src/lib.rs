#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot clustering and trend forecasting over uploaded crime statistics.
//!
//! The two public operations, [`hotspots`] and [`crime_trend`], take the
//! uploaded file name and bytes and run the whole pipeline synchronously:
//!
//! 1. Load and sniff the table ([`crime_hotspots_dataset`]).
//! 2. Aggregate rows per region ([`aggregate`]).
//! 3. Cluster regions into risk tiers ([`cluster`]) or fit a yearly trend
//!    ([`trend`]).
//! 4. Assemble the response records ([`assemble`]).
//!
//! Nothing is shared between calls; each upload owns all of its state.

pub mod aggregate;
pub mod assemble;
pub mod cluster;
pub mod trend;

use crime_hotspots_analysis_models::{HotspotRecord, RiskTier, TrendPoint};
use crime_hotspots_dataset::{
    DatasetError, ensure_csv_file_name, load_csv, resolve_columns, resolve_year_columns,
};
use thiserror::Error;

/// Number of clusters regions are partitioned into, one per risk tier.
pub const CLUSTER_COUNT: usize = RiskTier::ALL.len();

/// Message returned when an upload has no year columns.
const NO_YEAR_COLUMNS: &str = "CSV must contain year columns (e.g., 2020, 2021, 2022).";

/// Errors that can occur while analysing an upload.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The upload could not be loaded or its columns could not be resolved.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// There are not enough year points to cluster or fit a trend.
    #[error("{0}")]
    InsufficientData(String),

    /// Fewer regions than clusters were found.
    #[error("Need at least {clusters} distinct regions to assign risk tiers, found {regions}")]
    AmbiguousClustering {
        /// Number of distinct regions in the upload.
        regions: usize,
        /// Number of clusters requested.
        clusters: usize,
    },

    /// Any other failure while computing or assembling results.
    #[error("Processing error: {0}")]
    Processing(String),
}

/// Tuning for the clustering and forecasting stages.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Seed for k-means initialization.
    pub seed: u64,
    /// Number of independent k-means runs; the lowest-inertia run is kept.
    pub restarts: usize,
    /// Iteration cap per k-means run.
    pub max_iterations: usize,
    /// Relative centroid-shift threshold for k-means convergence.
    pub tolerance: f64,
    /// Number of years to forecast past the last observed year.
    pub forecast_years: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            restarts: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            forecast_years: 3,
        }
    }
}

/// Clusters the regions of an uploaded CSV into risk tiers.
///
/// # Errors
///
/// * [`DatasetError::InvalidFileType`] if `file_name` does not end in `.csv`
/// * [`DatasetError::MissingColumn`] if a required column is absent
/// * [`AnalysisError::InsufficientData`] if there are no year columns
/// * [`AnalysisError::AmbiguousClustering`] if fewer than
///   [`CLUSTER_COUNT`] regions have distinct yearly totals
pub fn hotspots(
    file_name: &str,
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<Vec<HotspotRecord>, AnalysisError> {
    ensure_csv_file_name(file_name)?;
    let table = load_csv(bytes)?;
    let roles = resolve_columns(table.headers())?;
    if roles.years.is_empty() {
        return Err(AnalysisError::InsufficientData(NO_YEAR_COLUMNS.to_owned()));
    }

    let aggregation = aggregate::aggregate_regions(&table, &roles);
    let features = aggregation
        .feature_matrix()
        .map_err(|e| AnalysisError::Processing(format!("invalid feature matrix: {e}")))?;

    let assignment = cluster::cluster_regions(&features, config)?;
    let records = assemble::assemble_hotspots(aggregation.regions(), &assignment, &roles.years)?;

    log::info!(
        "Hotspots for {file_name}: {} rows, {} regions, {} years",
        table.len(),
        records.len(),
        roles.years.len()
    );
    for record in &records {
        log::trace!(
            "{}: {} risk (cluster {}), top crime {} ({})",
            record.state,
            record.risk,
            record.cluster,
            record.top_crime,
            record.crime_color
        );
    }
    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            "Hotspot output: {}",
            serde_json::to_string(&records).unwrap_or_default()
        );
    }

    Ok(records)
}

/// Fits a linear trend through the yearly totals of an uploaded CSV and
/// forecasts the following years.
///
/// Only the year columns are needed; other columns are ignored.
///
/// # Errors
///
/// * [`DatasetError::InvalidFileType`] if `file_name` does not end in `.csv`
/// * [`AnalysisError::InsufficientData`] if there are fewer than two year
///   columns
pub fn crime_trend(
    file_name: &str,
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<Vec<TrendPoint>, AnalysisError> {
    ensure_csv_file_name(file_name)?;
    let table = load_csv(bytes)?;
    let years = resolve_year_columns(table.headers());
    if years.is_empty() {
        return Err(AnalysisError::InsufficientData(NO_YEAR_COLUMNS.to_owned()));
    }

    let totals = trend::yearly_totals(&table, &years);
    let points = trend::forecast(&totals, config.forecast_years)?;

    log::info!(
        "Trend for {file_name}: {} observed years, {} points",
        totals.len(),
        points.len()
    );

    Ok(points)
}
