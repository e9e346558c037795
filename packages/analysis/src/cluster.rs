//! Risk clustering.
//!
//! Regions are described by their per-year totals. Features are
//! standardized across regions, partitioned with seeded k-means, and the
//! resulting clusters are ranked by centroid magnitude into risk tiers.

use crime_hotspots_analysis_models::RiskTier;
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng as _;
use rand::rngs::StdRng;

use crate::{AnalysisConfig, AnalysisError, CLUSTER_COUNT};

/// Standardizes each feature column to zero mean and unit population
/// variance. Columns with zero variance are only centered.
#[must_use]
pub fn standardize(features: &Array2<f64>) -> Array2<f64> {
    let Some(mean) = features.mean_axis(Axis(0)) else {
        return features.clone();
    };
    let scale = features
        .std_axis(Axis(0), 0.0)
        .mapv(|s| if s > 0.0 { s } else { 1.0 });
    (features - &mean) / &scale
}

/// Number of pairwise different rows in `features`.
fn distinct_rows(features: &Array2<f64>) -> usize {
    let mut seen: Vec<ArrayView1<'_, f64>> = Vec::new();
    for row in features.rows() {
        if !seen.contains(&row) {
            seen.push(row);
        }
    }
    seen.len()
}

/// Maps each cluster id to a risk tier by ranking centroid coordinate sums
/// ascending: the smallest sum is [`RiskTier::Low`], the largest
/// [`RiskTier::High`]. Equal sums rank by cluster id.
///
/// # Errors
///
/// Returns [`AnalysisError::Processing`] if there are more centroids than
/// risk tiers.
pub fn rank_clusters(centroids: &Array2<f64>) -> Result<Vec<RiskTier>, AnalysisError> {
    let sums = centroids.sum_axis(Axis(1));
    let mut order: Vec<usize> = (0..sums.len()).collect();
    order.sort_by(|&a, &b| sums[a].total_cmp(&sums[b]).then(a.cmp(&b)));

    let mut tiers = vec![RiskTier::Low; sums.len()];
    for (rank, &cluster) in order.iter().enumerate() {
        tiers[cluster] = RiskTier::from_rank(rank).ok_or_else(|| {
            AnalysisError::Processing(format!(
                "cannot map {} clusters onto {} risk tiers",
                sums.len(),
                RiskTier::ALL.len()
            ))
        })?;
    }
    Ok(tiers)
}

/// Cluster id and risk tier for each region, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// Cluster id per region.
    pub clusters: Vec<usize>,
    /// Risk tier per cluster id.
    pub tiers: Vec<RiskTier>,
    /// Within-cluster sum of squares of the kept run.
    pub inertia: f64,
}

impl ClusterAssignment {
    /// Risk tier of the region at `index`.
    #[must_use]
    pub fn tier_of(&self, index: usize) -> Option<RiskTier> {
        self.clusters
            .get(index)
            .and_then(|&c| self.tiers.get(c).copied())
    }
}

/// Clusters regions, one row of raw features each, into risk tiers.
///
/// Runs k-means++ seeded from `config.seed`, `config.restarts` times, and
/// keeps the run with the lowest inertia.
///
/// # Errors
///
/// * [`AnalysisError::AmbiguousClustering`] if fewer than [`CLUSTER_COUNT`]
///   regions have distinct features
/// * [`AnalysisError::Processing`] if k-means fails to fit
pub fn cluster_regions(
    features: &Array2<f64>,
    config: &AnalysisConfig,
) -> Result<ClusterAssignment, AnalysisError> {
    let distinct = distinct_rows(features);
    if distinct < CLUSTER_COUNT {
        return Err(AnalysisError::AmbiguousClustering {
            regions: distinct,
            clusters: CLUSTER_COUNT,
        });
    }

    let scaled = standardize(features);
    let dataset = DatasetBase::from(scaled.clone());
    let rng = StdRng::seed_from_u64(config.seed);

    let model = KMeans::params_with(CLUSTER_COUNT, rng, L2Dist)
        .n_runs(config.restarts.max(1))
        .max_n_iterations(u64::try_from(config.max_iterations.max(1)).unwrap_or(u64::MAX))
        .tolerance(config.tolerance)
        .fit(&dataset)
        .map_err(|e| AnalysisError::Processing(format!("k-means failed: {e}")))?;

    let labels: Array1<usize> = model.predict(&scaled);
    let tiers = rank_clusters(model.centroids())?;

    log::debug!(
        "Clustered {} regions (inertia {:.4}), tiers by cluster id: {tiers:?}",
        features.nrows(),
        model.inertia()
    );

    Ok(ClusterAssignment {
        clusters: labels.to_vec(),
        tiers,
        inertia: model.inertia(),
    })
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let scaled = standardize(&array![[1.0, 5.0], [3.0, 5.0]]);
        assert!((scaled[[0, 0]] - -1.0).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 1.0).abs() < 1e-12);
        // Constant feature is centered only.
        assert!(scaled[[0, 1]].abs() < 1e-12);
        assert!(scaled[[1, 1]].abs() < 1e-12);
    }

    #[test]
    fn counts_distinct_rows() {
        assert_eq!(distinct_rows(&array![[1.0], [1.0], [2.0], [1.0]]), 2);
        assert_eq!(distinct_rows(&array![[1.0, 2.0], [2.0, 1.0]]), 2);
    }

    #[test]
    fn separates_obvious_groups() {
        let values = [0.0, 0.1, 0.2, 10.0, 10.1, 10.2, 50.0, 50.1, 50.2];
        let features = Array2::from_shape_fn((values.len(), 2), |(i, _)| values[i]);
        let assignment = cluster_regions(&features, &config()).unwrap();

        let labels = &assignment.clusters;
        for group in labels.chunks(3) {
            assert!(group.iter().all(|&c| c == group[0]), "labels {labels:?}");
        }
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[3], labels[6]);
        assert_ne!(labels[0], labels[6]);
        assert_eq!(assignment.tier_of(0), Some(RiskTier::Low));
        assert_eq!(assignment.tier_of(8), Some(RiskTier::High));
    }

    #[test]
    fn clustering_is_deterministic_for_a_seed() {
        let features = Array2::from_shape_fn((20, 2), |(i, j)| {
            let i = u32::try_from(i).unwrap();
            f64::from(if j == 0 { i % 7 } else { i * i % 11 })
        });
        let a = cluster_regions(&features, &config()).unwrap();
        let b = cluster_regions(&features, &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ranks_clusters_by_centroid_sum() {
        let tiers = rank_clusters(&array![[5.0, 5.0], [-1.0, 0.0], [2.0, 0.0]]).unwrap();
        assert_eq!(tiers, [RiskTier::High, RiskTier::Low, RiskTier::Medium]);
    }

    #[test]
    fn rejects_more_clusters_than_tiers() {
        assert!(rank_clusters(&Array2::zeros((4, 1))).is_err());
    }

    #[test]
    fn assigns_high_tier_to_largest_regions() {
        let features = array![
            [10.0, 12.0],
            [11.0, 13.0],
            [500.0, 520.0],
            [100.0, 110.0],
            [105.0, 108.0],
        ];
        let assignment = cluster_regions(&features, &config()).unwrap();

        assert_eq!(assignment.tier_of(0), Some(RiskTier::Low));
        assert_eq!(assignment.tier_of(1), Some(RiskTier::Low));
        assert_eq!(assignment.tier_of(2), Some(RiskTier::High));
        assert_eq!(assignment.tier_of(3), Some(RiskTier::Medium));
        assert_eq!(assignment.tier_of(4), Some(RiskTier::Medium));

        let mut tiers = assignment.tiers.clone();
        tiers.sort();
        assert_eq!(tiers, RiskTier::ALL);
    }

    #[test]
    fn clustering_two_regions_is_ambiguous() {
        let err = cluster_regions(&array![[1.0], [2.0]], &config()).unwrap_err();
        assert!(
            matches!(err, AnalysisError::AmbiguousClustering { regions: 2, clusters: 3 }),
            "got {err:?}"
        );
    }

    #[test]
    fn identical_regions_are_ambiguous() {
        let features = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [2.0, 2.0]];
        let err = cluster_regions(&features, &config()).unwrap_err();
        assert!(
            matches!(err, AnalysisError::AmbiguousClustering { regions: 2, clusters: 3 }),
            "got {err:?}"
        );
    }
}
