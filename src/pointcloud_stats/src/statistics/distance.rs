//! Nearest-neighbor distance queries.
//!
//! Each query point is handled independently by a rayon worker; output slot
//! `i` is written only by the worker that owns input point `i`.

use rayon::prelude::*;
use tracing::debug;

use crate::point_cloud::PointCloud;
use crate::spatial_index::SpatialIndex;

/// Distance from every `source` point to its nearest point in `target`.
///
/// Uses k=1, so a source point that also appears in `target` gets
/// distance 0. Points with no neighbor (empty target) get 0.0.
pub fn point_cloud_to_point_cloud_distance<I: SpatialIndex>(
    source: &PointCloud,
    target: &PointCloud,
) -> Vec<f64> {
    let index = I::build(&target.points);

    source
        .points
        .par_iter()
        .map(|point| {
            let result = index.search_knn(point, 1);
            match result.squared_distances.first() {
                Some(dist_sq) => dist_sq.sqrt(),
                None => {
                    debug!("point_cloud_to_point_cloud_distance: found a point without neighbors");
                    0.0
                }
            }
        })
        .collect()
}

/// Distance from every point to its nearest *other* point in the same cloud.
///
/// Queries k=2 and takes the second hit, since the first hit is the query
/// point itself. Clouds with a single point yield 0.0.
pub fn nearest_neighbor_distance<I: SpatialIndex>(input: &PointCloud) -> Vec<f64> {
    let index = I::build(&input.points);

    input
        .points
        .par_iter()
        .map(|point| {
            let result = index.search_knn(point, 2);
            if result.count() <= 1 {
                debug!("nearest_neighbor_distance: found a point without neighbors");
                0.0
            } else {
                result.squared_distances[1].sqrt()
            }
        })
        .collect()
}
