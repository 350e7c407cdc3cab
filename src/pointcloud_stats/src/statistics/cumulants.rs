//! One-pass moment estimator shared by the CPU and device paths.
//!
//! Both paths reduce a point array to the same nine raw sums and then call
//! [`Cumulants::finalize`], so mean and covariance are always derived by one
//! piece of code regardless of where the reduction ran.

use nalgebra::{Matrix3, Vector3};

/// Number of running sums: three first-order, six second-order.
pub const NUM_CUMULANTS: usize = 9;

/// Raw first- and second-order sums over a set of points.
///
/// Layout of `sums`:
/// `[Σx, Σy, Σz, Σxx, Σxy, Σxz, Σyy, Σyz, Σzz]`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cumulants {
    pub sums: [f64; NUM_CUMULANTS],
    pub count: usize,
}

impl Cumulants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate all points in a single linear pass.
    pub fn from_points(points: &[Vector3<f64>]) -> Self {
        let mut cumulants = Self::new();
        for point in points {
            cumulants.add_point(point);
        }
        cumulants
    }

    /// Build from sums produced elsewhere (e.g. read back from a device).
    pub fn from_sums(sums: [f64; NUM_CUMULANTS], count: usize) -> Self {
        Self { sums, count }
    }

    #[inline]
    pub fn add_point(&mut self, p: &Vector3<f64>) {
        self.sums[0] += p.x;
        self.sums[1] += p.y;
        self.sums[2] += p.z;
        self.sums[3] += p.x * p.x;
        self.sums[4] += p.x * p.y;
        self.sums[5] += p.x * p.z;
        self.sums[6] += p.y * p.y;
        self.sums[7] += p.y * p.z;
        self.sums[8] += p.z * p.z;
        self.count += 1;
    }

    /// Combine sums accumulated over a disjoint set of points.
    pub fn merge(&mut self, other: &Cumulants) {
        for (a, b) in self.sums.iter_mut().zip(other.sums.iter()) {
            *a += b;
        }
        self.count += other.count;
    }

    /// Convert the sums into mean and covariance.
    ///
    /// All nine sums are divided by N first; covariance entries are
    /// `E[xi*xj] - E[xi]*E[xj]` over those averages. With no points the
    /// result is a zero mean and an identity covariance.
    pub fn finalize(&self) -> (Vector3<f64>, Matrix3<f64>) {
        if self.count == 0 {
            return (Vector3::zeros(), Matrix3::identity());
        }

        let n = self.count as f64;
        let c = self.sums.map(|s| s / n);

        let mean = Vector3::new(c[0], c[1], c[2]);

        let xx = c[3] - c[0] * c[0];
        let yy = c[6] - c[1] * c[1];
        let zz = c[8] - c[2] * c[2];
        let xy = c[4] - c[0] * c[1];
        let xz = c[5] - c[0] * c[2];
        let yz = c[7] - c[1] * c[2];

        #[rustfmt::skip]
        let covariance = Matrix3::new(
            xx, xy, xz,
            xy, yy, yz,
            xz, yz, zz,
        );

        (mean, covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_finalize() {
        let (mean, cov) = Cumulants::new().finalize();
        assert_eq!(mean, Vector3::zeros());
        assert_eq!(cov, Matrix3::identity());
    }

    #[test]
    fn test_sums_layout() {
        let c = Cumulants::from_points(&[Vector3::new(1.0, 2.0, 3.0)]);
        assert_eq!(c.sums, [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 6.0, 9.0]);
        assert_eq!(c.count, 1);
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let points: Vec<_> = (0..20)
            .map(|i| {
                let t = i as f64;
                Vector3::new(t, t * 0.5 - 3.0, (t * 0.3).sin())
            })
            .collect();

        let whole = Cumulants::from_points(&points);
        let mut merged = Cumulants::from_points(&points[..7]);
        merged.merge(&Cumulants::from_points(&points[7..]));

        assert_eq!(merged.count, whole.count);
        for (a, b) in merged.sums.iter().zip(whole.sums.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_finalize_symmetric() {
        let c = Cumulants::from_points(&[
            Vector3::new(1.0, 0.0, 2.0),
            Vector3::new(-1.0, 3.0, 0.5),
            Vector3::new(0.0, -2.0, 1.0),
        ]);
        let (_, cov) = c.finalize();
        assert_eq!(cov, cov.transpose());
    }
}
