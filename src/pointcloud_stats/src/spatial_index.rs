//! k-nearest-neighbor search over point coordinates.
//!
//! Statistics functions only rely on the [`SpatialIndex`] trait, so any
//! tree- or grid-based backend can be plugged in. Two backends ship here:
//!
//! - [`KdTreeIndex`]: kiddo immutable KD-tree (default)
//! - [`BruteForceIndex`]: linear scan, used as a correctness reference
//!
//! An index is a snapshot: it copies the coordinates at build time and keeps
//! no link to the cloud they came from. Rebuild it whenever the cloud changes.
//!
//! # Usage
//!
//! ```ignore
//! let index = KdTreeIndex::build(&cloud.points);
//! let result = index.search_knn(&query, 2);
//! for (idx, dist_sq) in result.iter() {
//!     // Process neighbor...
//! }
//! ```

use std::num::NonZeroUsize;

use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use nalgebra::Vector3;

/// Leaf bucket size for the KD-tree.
///
/// The immutable tree balances by splitting on sorted order, so leaves may
/// hold any number of coincident or coplanar points.
const BUCKET_SIZE: usize = 32;

/// Result of a k-nearest-neighbor query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnnResult {
    /// Indices of the neighbors in the indexed point slice.
    pub indices: Vec<usize>,
    /// Squared Euclidean distances, ascending.
    pub squared_distances: Vec<f64>,
}

impl KnnResult {
    /// Number of neighbors found (at most the requested `k`).
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate over `(index, squared_distance)` pairs, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices
            .iter()
            .copied()
            .zip(self.squared_distances.iter().copied())
    }
}

/// Build-once, query-many nearest-neighbor index.
///
/// Implementations must be shareable across worker threads, since statistics
/// functions query one index from many rayon workers at once.
pub trait SpatialIndex: Send + Sync + Sized {
    /// Build an index over a snapshot of `points`.
    fn build(points: &[Vector3<f64>]) -> Self;

    /// Find the `k` indexed points nearest to `query`.
    ///
    /// Returns fewer than `k` neighbors if the index holds fewer points.
    fn search_knn(&self, query: &Vector3<f64>, k: usize) -> KnnResult;

    /// Number of indexed points.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// KD-tree backed index using kiddo's immutable tree.
#[derive(Debug)]
pub struct KdTreeIndex {
    /// `None` when built from an empty slice.
    /// Generic args: A=f64 (coordinate type), T=u64 (item/index type), K=3 (dimensions), B=bucket size
    kdtree: Option<ImmutableKdTree<f64, u64, 3, BUCKET_SIZE>>,
    len: usize,
}

impl SpatialIndex for KdTreeIndex {
    fn build(points: &[Vector3<f64>]) -> Self {
        if points.is_empty() {
            return Self {
                kdtree: None,
                len: 0,
            };
        }

        let coords: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();

        // The item value (u64) is automatically set to the array index
        let kdtree: ImmutableKdTree<f64, u64, 3, BUCKET_SIZE> =
            ImmutableKdTree::new_from_slice(&coords);

        Self {
            kdtree: Some(kdtree),
            len: points.len(),
        }
    }

    fn search_knn(&self, query: &Vector3<f64>, k: usize) -> KnnResult {
        let Some(kdtree) = &self.kdtree else {
            return KnnResult::default();
        };
        let Some(k) = NonZeroUsize::new(k) else {
            return KnnResult::default();
        };

        let results = kdtree.nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k);

        KnnResult {
            indices: results.iter().map(|nn| nn.item as usize).collect(),
            squared_distances: results.iter().map(|nn| nn.distance).collect(),
        }
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Exhaustive-search index.
///
/// O(N) per query; intended for tests and very small clouds.
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    points: Vec<Vector3<f64>>,
}

impl SpatialIndex for BruteForceIndex {
    fn build(points: &[Vector3<f64>]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    fn search_knn(&self, query: &Vector3<f64>, k: usize) -> KnnResult {
        let mut candidates: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p - query).norm_squared()))
            .collect();

        candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        candidates.truncate(k);

        KnnResult {
            indices: candidates.iter().map(|&(i, _)| i).collect(),
            squared_distances: candidates.iter().map(|&(_, d)| d).collect(),
        }
    }

    fn len(&self) -> usize {
        self.points.len()
    }
}
