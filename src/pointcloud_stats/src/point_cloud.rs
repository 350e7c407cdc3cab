//! Point cloud container and in-place geometric operations.
//!
//! A [`PointCloud`] holds an ordered list of 3D points and two optional
//! per-point attribute arrays (normals and colors). Each attribute array is
//! either empty or exactly as long as the point array.

use std::ops::{Add, AddAssign};

use nalgebra::{Matrix4, Vector3};

/// An unordered set of 3D points with optional normals and colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    /// Point coordinates.
    pub points: Vec<Vector3<f64>>,
    /// Per-point normals (empty, or one per point).
    pub normals: Vec<Vector3<f64>>,
    /// Per-point RGB colors in [0, 1] (empty, or one per point).
    pub colors: Vec<Vector3<f64>>,
}

impl PointCloud {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud from coordinates only.
    pub fn from_points(points: Vec<Vector3<f64>>) -> Self {
        Self {
            points,
            ..Default::default()
        }
    }

    /// Remove all points, normals and colors.
    pub fn clear(&mut self) {
        self.points.clear();
        self.normals.clear();
        self.colors.clear();
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the cloud has no points.
    pub fn is_empty(&self) -> bool {
        !self.has_points()
    }

    pub fn has_points(&self) -> bool {
        !self.points.is_empty()
    }

    /// True if every point has a normal.
    pub fn has_normals(&self) -> bool {
        self.has_points() && self.normals.len() == self.points.len()
    }

    /// True if every point has a color.
    pub fn has_colors(&self) -> bool {
        self.has_points() && self.colors.len() == self.points.len()
    }

    /// Component-wise minimum over all points.
    ///
    /// The result is the lower corner of the axis-aligned bounding box and
    /// need not be a point of the cloud. Returns the zero vector when empty.
    pub fn min_bound(&self) -> Vector3<f64> {
        match self.points.split_first() {
            Some((first, rest)) => rest.iter().fold(*first, |acc, p| acc.inf(p)),
            None => Vector3::zeros(),
        }
    }

    /// Component-wise maximum over all points.
    ///
    /// The result is the upper corner of the axis-aligned bounding box and
    /// need not be a point of the cloud. Returns the zero vector when empty.
    pub fn max_bound(&self) -> Vector3<f64> {
        match self.points.split_first() {
            Some((first, rest)) => rest.iter().fold(*first, |acc, p| acc.sup(p)),
            None => Vector3::zeros(),
        }
    }

    /// Apply a 4x4 affine transformation in place.
    ///
    /// Points are treated as positions (w = 1) and receive the translation;
    /// normals are treated as directions (w = 0) and do not. Colors are left
    /// untouched.
    pub fn transform(&mut self, transformation: &Matrix4<f64>) -> &mut Self {
        for point in &mut self.points {
            *point = (transformation * point.push(1.0)).xyz();
        }
        for normal in &mut self.normals {
            *normal = (transformation * normal.push(0.0)).xyz();
        }
        self
    }

    /// Scale every normal to unit length.
    ///
    /// Zero-length normals are left as they are.
    pub fn normalize_normals(&mut self) -> &mut Self {
        for normal in &mut self.normals {
            let norm = normal.norm();
            if norm > 0.0 {
                *normal /= norm;
            }
        }
        self
    }

    /// Assign the same color to every point.
    pub fn paint_uniform_color(&mut self, color: Vector3<f64>) -> &mut Self {
        self.colors.clear();
        self.colors.resize(self.points.len(), color);
        self
    }

    /// Append the points of `other` to this cloud.
    ///
    /// Normals are kept only if `other` has normals and this cloud either
    /// had normals or was empty; otherwise the normal array is cleared. The
    /// same rule applies independently to colors.
    pub fn extend_from_cloud(&mut self, other: &PointCloud) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        let old_len = self.points.len();
        let keep_normals = other.has_normals() && (old_len == 0 || self.has_normals());
        let keep_colors = other.has_colors() && (old_len == 0 || self.has_colors());

        if keep_normals {
            self.normals.truncate(old_len);
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }
        if keep_colors {
            self.colors.truncate(old_len);
            self.colors.extend_from_slice(&other.colors);
        } else {
            self.colors.clear();
        }
        self.points.extend_from_slice(&other.points);
        self
    }

    /// Concatenate the cloud with itself, doubling every array.
    ///
    /// Equivalent to `A += A`. The copy reads from the already-present
    /// prefix of each array, so growing the storage never invalidates the
    /// source.
    pub fn append_self(&mut self) -> &mut Self {
        if self.is_empty() {
            return self;
        }
        let len = self.points.len();
        let keep_normals = self.has_normals();
        let keep_colors = self.has_colors();

        if keep_normals {
            self.normals.extend_from_within(..len);
        } else {
            self.normals.clear();
        }
        if keep_colors {
            self.colors.extend_from_within(..len);
        } else {
            self.colors.clear();
        }
        self.points.extend_from_within(..len);
        self
    }
}

impl AddAssign<&PointCloud> for PointCloud {
    fn add_assign(&mut self, rhs: &PointCloud) {
        self.extend_from_cloud(rhs);
    }
}

impl Add<&PointCloud> for &PointCloud {
    type Output = PointCloud;

    fn add(self, rhs: &PointCloud) -> PointCloud {
        let mut result = self.clone();
        result += rhs;
        result
    }
}
