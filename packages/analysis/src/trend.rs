//! Yearly trend forecasting.
//!
//! Sums every year column over the whole upload, fits an ordinary least
//! squares line through the (year, total) points and extrapolates a few
//! years past the last observed one.

use std::collections::BTreeMap;

use crime_hotspots_analysis_models::TrendPoint;
use crime_hotspots_dataset::{RawTable, YearColumn, coerce_numeric};

use crate::AnalysisError;

/// Sums each year's cells over all rows.
#[must_use]
pub fn yearly_totals(table: &RawTable, years: &[YearColumn]) -> BTreeMap<i32, f64> {
    years
        .iter()
        .map(|year| {
            let total = year
                .indices
                .iter()
                .flat_map(|&i| table.column(i))
                .map(|cell| coerce_numeric(cell).value())
                .sum();
            (year.year, total)
        })
        .collect()
}

/// Least squares line `total = slope * year + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change in total per year.
    pub slope: f64,
    /// Value of the line at year 0.
    pub intercept: f64,
    x_mean: f64,
    y_mean: f64,
}

impl LinearFit {
    /// Fits a line through `(year, total)` points.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InsufficientData`] if there are fewer than
    /// two distinct years.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(points: &BTreeMap<i32, f64>) -> Result<Self, AnalysisError> {
        if points.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "At least 2 year columns are needed to fit a trend, found {}",
                points.len()
            )));
        }

        let n = points.len() as f64;
        let x_mean = points.keys().map(|&x| f64::from(x)).sum::<f64>() / n;
        let y_mean = points.values().sum::<f64>() / n;

        let (sxy, sxx) = points
            .iter()
            .fold((0.0, 0.0), |(sxy, sxx), (&x, &y)| {
                let dx = f64::from(x) - x_mean;
                (dx.mul_add(y - y_mean, sxy), dx.mul_add(dx, sxx))
            });

        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: slope.mul_add(-x_mean, y_mean),
            x_mean,
            y_mean,
        })
    }

    /// Value of the line at `year`.
    #[must_use]
    pub fn predict(&self, year: i32) -> f64 {
        self.slope.mul_add(f64::from(year) - self.x_mean, self.y_mean)
    }
}

/// Rounds half to even and converts to a count, `None` if not finite or
/// negative.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> Option<u64> {
    let rounded = value.round_ties_even();
    (rounded.is_finite() && rounded >= 0.0).then(|| rounded as u64)
}

/// Fits a line through `totals` and forecasts `horizon` years after the
/// last observed year.
///
/// The result has one point per year across the observed and forecast
/// ranges, ascending. Observed years carry `total_crimes`, forecast years
/// carry `predicted_total_crimes` floored at zero.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] if `totals` has fewer than
/// two years.
pub fn forecast(totals: &BTreeMap<i32, f64>, horizon: u32) -> Result<Vec<TrendPoint>, AnalysisError> {
    let fit = LinearFit::fit(totals)?;
    log::debug!(
        "Fitted trend: total = {:.4} * year + {:.4}",
        fit.slope,
        fit.intercept
    );

    let last_year = totals.keys().next_back().copied().ok_or_else(|| {
        AnalysisError::InsufficientData("No observed years to forecast from".to_owned())
    })?;

    let mut timeline: BTreeMap<i32, TrendPoint> = totals
        .iter()
        .map(|(&year, &total)| {
            (
                year,
                TrendPoint {
                    year,
                    total_crimes: to_count(total),
                    predicted_total_crimes: None,
                },
            )
        })
        .collect();

    for offset in 1..=horizon {
        let Some(year) = i32::try_from(offset)
            .ok()
            .and_then(|o| last_year.checked_add(o))
        else {
            break;
        };
        let predicted = to_count(fit.predict(year).max(0.0));
        timeline
            .entry(year)
            .or_insert(TrendPoint {
                year,
                total_crimes: None,
                predicted_total_crimes: None,
            })
            .predicted_total_crimes = predicted;
    }

    Ok(timeline.into_values().collect())
}
