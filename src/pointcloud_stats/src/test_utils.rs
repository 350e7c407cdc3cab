//! Synthetic point clouds with known statistics.
//!
//! Deterministic generators for tests and benchmarks.

use nalgebra::Vector3;

use crate::point_cloud::PointCloud;

/// The four corners `(0,0,0)`, `(1,0,0)`, `(0,1,0)`, `(0,0,1)`.
///
/// Mean is `(0.25, 0.25, 0.25)`; covariance has `0.1875` on the diagonal and
/// `-0.0625` elsewhere.
pub fn make_tetrahedron() -> PointCloud {
    PointCloud::from_points(vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    ])
}

/// Generate a half-cubic point cloud.
///
/// Creates 3 orthogonal planes (XY, YZ, ZX) forming a half-cube:
/// - XY plane: z=0, x∈[0,length], y∈[0,length]
/// - YZ plane: x=0, y∈[0,length], z∈[0,length]
/// - ZX plane: y=0, x∈[0,length], z∈[0,length]
///
/// Points on the shared edges appear once per plane, so the cloud contains
/// exact duplicates.
pub fn make_half_cubic_cloud(length: f64, interval: f64) -> PointCloud {
    let num_points_per_line = ((length / interval).round() as usize) + 1;
    let mut points = Vec::with_capacity(3 * num_points_per_line * num_points_per_line);

    for i in 0..num_points_per_line {
        for j in 0..num_points_per_line {
            let u = interval * (j as f64);
            let v = interval * (i as f64);

            points.push(Vector3::new(u, v, 0.0));
            points.push(Vector3::new(0.0, u, v));
            points.push(Vector3::new(u, 0.0, v));
        }
    }

    PointCloud::from_points(points)
}

/// Generate uniformly distributed points inside a sphere.
///
/// # Arguments
/// * `center` - Center of the sphere
/// * `radius` - Radius of the sphere
/// * `num_points` - Number of points to generate
/// * `seed` - Random seed for reproducibility
pub fn make_random_sphere(
    center: [f64; 3],
    radius: f64,
    num_points: usize,
    seed: u64,
) -> PointCloud {
    // Simple LCG for reproducibility
    let mut rng_state = seed;
    let mut next_random = || -> f64 {
        rng_state = rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((rng_state >> 11) as f64) / ((1u64 << 53) as f64)
    };

    let center = Vector3::from(center);
    let mut points = Vec::with_capacity(num_points);

    while points.len() < num_points {
        // Rejection sampling in the unit cube
        let v = Vector3::new(
            next_random() * 2.0 - 1.0,
            next_random() * 2.0 - 1.0,
            next_random() * 2.0 - 1.0,
        );
        let r2 = v.norm_squared();
        if r2 <= 1.0 && r2 > 0.0 {
            let r = next_random().cbrt() * radius;
            points.push(center + v * (r / r2.sqrt()));
        }
    }

    PointCloud::from_points(points)
}

/// Fill normals with `+Z` and colors with mid-grey.
pub fn with_default_attributes(mut cloud: PointCloud) -> PointCloud {
    cloud.normals = vec![Vector3::z(); cloud.len()];
    cloud.paint_uniform_color(Vector3::new(0.5, 0.5, 0.5));
    cloud
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_cubic_point_count() {
        let cloud = make_half_cubic_cloud(2.0, 0.5);
        // 3 planes × 5² points each
        assert_eq!(cloud.len(), 3 * 5 * 5);
        assert_eq!(cloud.min_bound(), Vector3::zeros());
        assert_eq!(cloud.max_bound(), Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_random_sphere_within_radius() {
        let cloud = make_random_sphere([1.0, -2.0, 3.0], 5.0, 200, 42);
        assert_eq!(cloud.len(), 200);
        let center = Vector3::new(1.0, -2.0, 3.0);
        for p in &cloud.points {
            assert!((p - center).norm() <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn test_random_sphere_deterministic() {
        let a = make_random_sphere([0.0; 3], 1.0, 50, 3);
        let b = make_random_sphere([0.0; 3], 1.0, 50, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_attributes() {
        let cloud = with_default_attributes(make_tetrahedron());
        assert!(cloud.has_normals());
        assert!(cloud.has_colors());
    }
}
