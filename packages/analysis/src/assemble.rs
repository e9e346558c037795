//! Joins aggregates, cluster assignments and color coding into the
//! per-region hotspot records.

use std::collections::BTreeMap;

use crime_hotspots_analysis_models::{CrimeColor, HotspotRecord};
use crime_hotspots_dataset::{BLANK_CRIME_TYPE, YearColumn};

use crate::AnalysisError;
use crate::aggregate::RegionAggregate;
use crate::cluster::ClusterAssignment;

/// The crime type with the highest count.
///
/// Ties go to the label that sorts first. An empty breakdown yields
/// [`BLANK_CRIME_TYPE`].
#[must_use]
pub fn top_crime(counts: &BTreeMap<String, u64>) -> String {
    let mut best: Option<(&String, u64)> = None;
    for (label, &count) in counts {
        if best.is_none_or(|(_, max)| count > max) {
            best = Some((label, count));
        }
    }
    best.map_or_else(|| BLANK_CRIME_TYPE.to_owned(), |(label, _)| label.clone())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Builds one [`HotspotRecord`] per region, in region order.
///
/// # Errors
///
/// Returns [`AnalysisError::Processing`] if the assignment does not cover
/// every region.
pub fn assemble_hotspots(
    regions: &[RegionAggregate],
    assignment: &ClusterAssignment,
    years: &[YearColumn],
) -> Result<Vec<HotspotRecord>, AnalysisError> {
    regions
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let (Some(&cluster), Some(risk)) = (assignment.clusters.get(i), assignment.tier_of(i))
            else {
                return Err(AnalysisError::Processing(format!(
                    "no cluster assignment for region {:?}",
                    region.region
                )));
            };

            let top_crime = top_crime(&region.crime_counts);
            let year_fields = years
                .iter()
                .map(|y| {
                    let total = region.year_totals.get(&y.year).copied().unwrap_or(0);
                    (y.name.clone(), total)
                })
                .collect();

            Ok(HotspotRecord {
                state: region.region.clone(),
                latitude: finite(region.latitude),
                longitude: finite(region.longitude),
                risk,
                cluster,
                crime_color: CrimeColor::for_crime(&top_crime),
                top_crime,
                rate_of_crime: finite(region.rate),
                crime_breakdown: region.crime_counts.clone(),
                years: year_fields,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_hotspots_analysis_models::RiskTier;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn picks_highest_count() {
        assert_eq!(top_crime(&counts(&[("assault", 45), ("theft", 25)])), "assault");
    }

    #[test]
    fn ties_go_to_first_label() {
        assert_eq!(top_crime(&counts(&[("fraud", 5), ("theft", 5)])), "fraud");
    }

    #[test]
    fn empty_breakdown_is_other() {
        assert_eq!(top_crime(&BTreeMap::new()), "other");
    }

    #[test]
    fn non_finite_fields_become_null() {
        let years = vec![YearColumn {
            year: 2019,
            name: "2019".to_owned(),
            indices: vec![5],
        }];
        let mut region = RegionAggregate::new("Alpha".to_owned(), 1.0, f64::NAN, f64::INFINITY, &years);
        region.add("theft", 2019, 4);

        let assignment = ClusterAssignment {
            clusters: vec![1],
            tiers: vec![RiskTier::Low, RiskTier::High, RiskTier::Medium],
            inertia: 0.0,
        };

        let records = assemble_hotspots(&[region], &assignment, &years).unwrap();
        let record = &records[0];
        assert_eq!(record.latitude, Some(1.0));
        assert_eq!(record.longitude, None);
        assert_eq!(record.rate_of_crime, None);
        assert_eq!(record.risk, RiskTier::High);
        assert_eq!(record.cluster, 1);
        assert_eq!(record.top_crime, "theft");
        assert_eq!(record.crime_color, CrimeColor::Red);
        assert_eq!(record.years["2019"], 4);
    }

    #[test]
    fn missing_assignment_is_an_error() {
        let region = RegionAggregate::new("Alpha".to_owned(), 0.0, 0.0, 0.0, &[]);
        let assignment = ClusterAssignment {
            clusters: Vec::new(),
            tiers: Vec::new(),
            inertia: 0.0,
        };
        assert!(assemble_hotspots(&[region], &assignment, &[]).is_err());
    }
}
