//! Spatial statistics over 3D point clouds.
//!
//! This library computes bounding extents, affine transforms, cloud
//! concatenation, nearest-neighbor distances and first/second-order moments
//! of point clouds, with an optional device path for the moment reduction.
//!
//! # Architecture
//!
//! - [`point_cloud`]: the `PointCloud` container and its in-place operations
//! - [`spatial_index`]: k-nearest-neighbor search behind the `SpatialIndex` trait
//! - [`statistics`]: distance and moment functions (rayon-parallel)
//! - [`device`]: device mirrors of cloud arrays and the device moment reduction
//!
//! # Usage
//!
//! ```ignore
//! use pointcloud_stats::{compute_mean_and_covariance, compute_nearest_neighbor_distance};
//! use pointcloud_stats::PointCloud;
//!
//! let cloud = PointCloud::from_points(load_points());
//! let (mean, covariance) = compute_mean_and_covariance(&cloud);
//! let spacing = compute_nearest_neighbor_distance(&cloud);
//! ```

pub mod device;
pub mod point_cloud;
pub mod spatial_index;
pub mod statistics;
pub mod test_utils;

pub use point_cloud::PointCloud;
pub use spatial_index::{BruteForceIndex, KdTreeIndex, KnnResult, SpatialIndex};
pub use statistics::{
    compute_mahalanobis_distance, compute_mean_and_covariance, compute_nearest_neighbor_distance,
    compute_nearest_neighbor_distance_with_index, compute_point_cloud_to_point_cloud_distance,
    compute_point_cloud_to_point_cloud_distance_with_index, Cumulants,
};

// Device path (CUDA backend requires the `cuda` feature)
pub use device::{
    compute_mean_and_covariance_device, Accelerator, DeviceBuffer, DeviceError, DeviceMirror,
    HostAccelerator, MirrorArray, ReductionConfig,
};
#[cfg(feature = "cuda")]
pub use device::CudaAccelerator;
