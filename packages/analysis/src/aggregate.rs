//! Per-region aggregation.
//!
//! Collapses the row-per-(region, crime type) layout of an upload into one
//! [`RegionAggregate`] per region. Coordinates and rate are taken from the
//! first row seen for a region; later rows for the same region only add
//! counts, even when their coordinates differ.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crime_hotspots_dataset::{
    Coerced, ColumnRoles, RawTable, YearColumn, coerce_numeric, normalize_crime_type,
};
use ndarray::{Array2, ShapeError};

/// Accumulated counts for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAggregate {
    /// Region name (trimmed cell value).
    pub region: String,
    /// Latitude from the region's first row.
    pub latitude: f64,
    /// Longitude from the region's first row.
    pub longitude: f64,
    /// Crime rate from the region's first row.
    pub rate: f64,
    /// Cumulative count per normalized crime-type label.
    pub crime_counts: BTreeMap<String, u64>,
    /// Cumulative count per year across all crime types.
    pub year_totals: BTreeMap<i32, u64>,
}

impl RegionAggregate {
    /// Creates an empty aggregate with every year present at zero.
    #[must_use]
    pub fn new(region: String, latitude: f64, longitude: f64, rate: f64, years: &[YearColumn]) -> Self {
        Self {
            region,
            latitude,
            longitude,
            rate,
            crime_counts: BTreeMap::new(),
            year_totals: years.iter().map(|y| (y.year, 0)).collect(),
        }
    }

    /// Adds `count` to both the crime-type bucket and the year bucket.
    pub fn add(&mut self, label: &str, year: i32, count: u64) {
        match self.crime_counts.get_mut(label) {
            Some(total) => *total = total.saturating_add(count),
            None => {
                self.crime_counts.insert(label.to_owned(), count);
            }
        }
        let total = self.year_totals.entry(year).or_insert(0);
        *total = total.saturating_add(count);
    }

    /// Year totals in ascending year order, as clustering features.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn feature_vector(&self) -> Vec<f64> {
        self.year_totals.values().map(|&v| v as f64).collect()
    }
}

/// All region aggregates of an upload, in first-seen order, plus the
/// universe of crime-type labels.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    regions: Vec<RegionAggregate>,
    index: HashMap<String, usize>,
    labels: BTreeSet<String>,
}

impl Aggregation {
    /// Returns the aggregate for `region`, inserting the one built by
    /// `create` if the region has not been seen yet.
    pub fn insert_if_absent(
        &mut self,
        region: &str,
        create: impl FnOnce() -> RegionAggregate,
    ) -> &mut RegionAggregate {
        let idx = if let Some(&idx) = self.index.get(region) {
            idx
        } else {
            let idx = self.regions.len();
            self.regions.push(create());
            self.index.insert(region.to_owned(), idx);
            idx
        };
        &mut self.regions[idx]
    }

    /// Records a crime-type label as part of the label universe.
    pub fn observe_label(&mut self, label: &str) {
        if !self.labels.contains(label) {
            self.labels.insert(label.to_owned());
        }
    }

    /// Gives every region a count for every observed label, zero where the
    /// region never saw it.
    pub fn fill_missing_labels(&mut self) {
        for region in &mut self.regions {
            for label in &self.labels {
                if !region.crime_counts.contains_key(label) {
                    region.crime_counts.insert(label.clone(), 0);
                }
            }
        }
    }

    /// Regions in first-seen order.
    #[must_use]
    pub fn regions(&self) -> &[RegionAggregate] {
        &self.regions
    }

    /// Every normalized crime-type label seen in the upload, sorted.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Year totals as a `(regions, years)` matrix, one row per region in
    /// first-seen order.
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] if regions disagree on their year count.
    pub fn feature_matrix(&self) -> Result<Array2<f64>, ShapeError> {
        let years = self.regions.first().map_or(0, |r| r.year_totals.len());
        let flat = self
            .regions
            .iter()
            .flat_map(RegionAggregate::feature_vector)
            .collect();
        Array2::from_shape_vec((self.regions.len(), years), flat)
    }
}

/// Truncates a coerced cell to a whole count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_count(cell: Coerced) -> u64 {
    // Coerced values are never negative; `as` saturates on overflow.
    cell.value().trunc() as u64
}

/// Groups table rows by region.
///
/// Rows with a blank region cell are skipped.
#[must_use]
pub fn aggregate_regions(table: &RawTable, roles: &ColumnRoles) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut skipped = 0_usize;
    let mut defaulted = 0_usize;

    for row in table.rows() {
        let region = row[roles.region].trim();
        if region.is_empty() {
            skipped += 1;
            continue;
        }

        let label = normalize_crime_type(&row[roles.crime_type]);
        aggregation.observe_label(&label);

        let aggregate = aggregation.insert_if_absent(region, || {
            RegionAggregate::new(
                region.to_owned(),
                coerce_numeric(&row[roles.latitude]).value(),
                coerce_numeric(&row[roles.longitude]).value(),
                coerce_numeric(&row[roles.rate]).value(),
                &roles.years,
            )
        });

        for year in &roles.years {
            let mut count = 0_u64;
            for &i in &year.indices {
                let cell = coerce_numeric(&row[i]);
                if cell.is_defaulted() {
                    defaulted += 1;
                }
                count = count.saturating_add(whole_count(cell));
            }
            aggregate.add(&label, year.year, count);
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} row(s) with a blank region");
    }

    aggregation.fill_missing_labels();

    if defaulted > 0 {
        log::debug!("{defaulted} year cell(s) were not numeric and counted as 0");
    }
    log::debug!(
        "Aggregated {} rows into {} regions with {} crime types",
        table.len() - skipped,
        aggregation.regions().len(),
        aggregation.labels().len()
    );

    aggregation
}
