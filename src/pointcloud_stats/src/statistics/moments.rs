//! Mean, covariance and Mahalanobis distance on the CPU.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use super::cumulants::Cumulants;
use crate::point_cloud::PointCloud;

/// Mean and covariance of the cloud's points.
///
/// Empty clouds return a zero mean and an identity covariance.
pub fn mean_and_covariance(input: &PointCloud) -> (Vector3<f64>, Matrix3<f64>) {
    Cumulants::from_points(&input.points).finalize()
}

/// Mahalanobis distance of every point from the cloud's own distribution.
///
/// The covariance is inverted without any conditioning check. A singular
/// covariance yields an all-NaN inverse and therefore NaN distances.
pub fn mahalanobis_distance(input: &PointCloud) -> Vec<f64> {
    let (mean, covariance) = mean_and_covariance(input);
    let cov_inv = covariance
        .try_inverse()
        .unwrap_or_else(|| Matrix3::from_element(f64::NAN));

    input
        .points
        .par_iter()
        .map(|point| {
            let d = point - mean;
            d.dot(&(cov_inv * d)).sqrt()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tetrahedron_moments() {
        let cloud = crate::test_utils::make_tetrahedron();
        let (mean, cov) = mean_and_covariance(&cloud);

        assert_relative_eq!(mean, Vector3::new(0.25, 0.25, 0.25), epsilon = 1e-12);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 0.1875 } else { -0.0625 };
                assert_relative_eq!(cov[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_empty_moments() {
        let (mean, cov) = mean_and_covariance(&PointCloud::new());
        assert_eq!(mean, Vector3::zeros());
        assert_eq!(cov, Matrix3::identity());
    }

    #[test]
    fn test_mahalanobis_axis_aligned() {
        // Variance 1 on x and 4 on y; z spread keeps the covariance invertible
        let cloud = PointCloud::from_points(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.0),
            Vector3::new(0.0, -2.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ]);
        let (_, cov) = mean_and_covariance(&cloud);
        let distances = mahalanobis_distance(&cloud);

        // Per-axis variance is (sum of squares) / 6
        let expected_x = (1.0 / cov[(0, 0)]).sqrt();
        let expected_y = (4.0 / cov[(1, 1)]).sqrt();
        assert_relative_eq!(distances[0], expected_x, epsilon = 1e-12);
        assert_relative_eq!(distances[2], expected_y, epsilon = 1e-12);
        // Scaling by variance makes every axis equally distant
        assert_relative_eq!(distances[0], distances[2], epsilon = 1e-12);
        assert_relative_eq!(distances[0], distances[4], epsilon = 1e-12);
    }

    #[test]
    fn test_mahalanobis_singular_propagates_nan() {
        // Collinear points: covariance is rank one
        let cloud = PointCloud::from_points(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
        ]);
        let distances = mahalanobis_distance(&cloud);
        assert_eq!(distances.len(), 3);
        assert!(distances.iter().all(|d| !d.is_finite()));
    }

    #[test]
    fn test_mahalanobis_empty() {
        assert!(mahalanobis_distance(&PointCloud::new()).is_empty());
    }
}
