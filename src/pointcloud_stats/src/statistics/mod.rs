//! Point cloud statistics.
//!
//! - Cloud-to-cloud and nearest-neighbor distances (KD-tree backed)
//! - Mean and covariance via one-pass cumulants
//! - Mahalanobis distance
//!
//! # Algorithm: cumulant-based moments
//!
//! ```text
//! for p in points:
//!     s += [x, y, z, xx, xy, xz, yy, yz, zz]
//! c = s / N
//! mean = c[0..3]
//! cov[i][j] = E[xi*xj] - E[xi] * E[xj]
//! ```
//!
//! The same reduction runs on an accelerator through
//! [`crate::device::compute_mean_and_covariance_device`].
//!
//! Distance functions operate on squared distances and take a single square
//! root per output. The plain functions use [`KdTreeIndex`]; the
//! `*_with_index` variants accept any [`SpatialIndex`].

mod cumulants;
mod distance;
mod moments;

pub use cumulants::{Cumulants, NUM_CUMULANTS};

use nalgebra::{Matrix3, Vector3};

use crate::point_cloud::PointCloud;
use crate::spatial_index::{KdTreeIndex, SpatialIndex};

/// Distance from each `source` point to the closest `target` point.
pub fn compute_point_cloud_to_point_cloud_distance(
    source: &PointCloud,
    target: &PointCloud,
) -> Vec<f64> {
    distance::point_cloud_to_point_cloud_distance::<KdTreeIndex>(source, target)
}

/// [`compute_point_cloud_to_point_cloud_distance`] with a caller-chosen index.
pub fn compute_point_cloud_to_point_cloud_distance_with_index<I: SpatialIndex>(
    source: &PointCloud,
    target: &PointCloud,
) -> Vec<f64> {
    distance::point_cloud_to_point_cloud_distance::<I>(source, target)
}

/// Mean and covariance of a cloud; `(0, I)` when the cloud is empty.
pub fn compute_mean_and_covariance(input: &PointCloud) -> (Vector3<f64>, Matrix3<f64>) {
    moments::mean_and_covariance(input)
}

/// Mahalanobis distance of each point from the cloud's distribution.
pub fn compute_mahalanobis_distance(input: &PointCloud) -> Vec<f64> {
    moments::mahalanobis_distance(input)
}

/// Distance from each point to its nearest non-identical neighbor.
pub fn compute_nearest_neighbor_distance(input: &PointCloud) -> Vec<f64> {
    distance::nearest_neighbor_distance::<KdTreeIndex>(input)
}

/// [`compute_nearest_neighbor_distance`] with a caller-chosen index.
pub fn compute_nearest_neighbor_distance_with_index<I: SpatialIndex>(
    input: &PointCloud,
) -> Vec<f64> {
    distance::nearest_neighbor_distance::<I>(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial_index::BruteForceIndex;
    use crate::test_utils::{make_half_cubic_cloud, make_random_sphere, make_tetrahedron};
    use approx::assert_relative_eq;

    #[test]
    fn test_self_match_vs_nearest_other() {
        let cloud = make_tetrahedron();

        let to_self = compute_point_cloud_to_point_cloud_distance(&cloud, &cloud);
        assert!(to_self.iter().all(|&d| d == 0.0));

        // Origin is 1 from each axis point; axis points are 1 from the origin
        let nn = compute_nearest_neighbor_distance(&cloud);
        for d in nn {
            assert_relative_eq!(d, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_duplicates_give_zero_spacing() {
        // The half-cube repeats every point on its three shared edges
        let cloud = make_half_cubic_cloud(1.0, 0.5);
        let nn = compute_nearest_neighbor_distance(&cloud);
        let origin_hits = cloud
            .points
            .iter()
            .zip(&nn)
            .filter(|(p, _)| p.norm() == 0.0)
            .map(|(_, d)| *d)
            .collect::<Vec<_>>();
        assert_eq!(origin_hits.len(), 3);
        assert!(origin_hits.iter().all(|&d| d == 0.0));
        assert!(nn.iter().all(|&d| d <= 0.5 + 1e-12));
    }

    #[test]
    fn test_index_variants_agree() {
        let source = make_random_sphere([0.0; 3], 5.0, 200, 1);
        let target = make_random_sphere([1.0, 0.0, 0.0], 5.0, 150, 2);

        let a = compute_point_cloud_to_point_cloud_distance(&source, &target);
        let b = compute_point_cloud_to_point_cloud_distance_with_index::<BruteForceIndex>(
            &source, &target,
        );
        assert_eq!(a.len(), source.len());
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }

        let c = compute_nearest_neighbor_distance_with_index::<BruteForceIndex>(&source);
        let d = compute_nearest_neighbor_distance(&source);
        for (x, y) in c.iter().zip(&d) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_moments_after_transform() {
        let mut cloud = make_random_sphere([0.0; 3], 2.0, 500, 4);
        let (mean_before, cov_before) = compute_mean_and_covariance(&cloud);

        let m = nalgebra::Translation3::new(10.0, -5.0, 2.0).to_homogeneous();
        cloud.transform(&m);
        let (mean_after, cov_after) = compute_mean_and_covariance(&cloud);

        assert_relative_eq!(
            mean_after,
            mean_before + Vector3::new(10.0, -5.0, 2.0),
            epsilon = 1e-9
        );
        // Translation leaves the covariance unchanged up to cancellation error
        assert_relative_eq!(cov_after, cov_before, epsilon = 1e-8);
    }

    #[test]
    fn test_mahalanobis_mean_square_is_three() {
        // For the population covariance, the mean of squared Mahalanobis
        // distances equals the dimension
        let cloud = make_random_sphere([2.0, 2.0, 2.0], 3.0, 400, 8);
        let distances = compute_mahalanobis_distance(&cloud);
        let mean_sq = distances.iter().map(|d| d * d).sum::<f64>() / distances.len() as f64;
        assert_relative_eq!(mean_sq, 3.0, epsilon = 1e-8);
    }

    #[test]
    fn test_empty_cloud_statistics() {
        let empty = PointCloud::new();
        let (mean, cov) = compute_mean_and_covariance(&empty);
        assert_eq!(mean, Vector3::zeros());
        assert_eq!(cov, Matrix3::identity());
        assert!(compute_mahalanobis_distance(&empty).is_empty());
        assert!(compute_nearest_neighbor_distance(&empty).is_empty());
    }
}
