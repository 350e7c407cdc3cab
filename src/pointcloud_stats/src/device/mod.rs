//! Device-resident mirrors of point cloud arrays.
//!
//! A [`DeviceMirror`] keeps at most one accelerator buffer per array
//! (points, normals, colors) of a cloud. Buffers are owned values that free
//! their device memory when dropped, so a mirror never leaks across
//! refreshes and releases everything it holds when it goes out of scope.
//!
//! # Backends
//!
//! - [`HostAccelerator`]: host-memory emulation, always available
//! - [`CudaAccelerator`]: CubeCL on CUDA, requires the `cuda` feature
//!
//! # Example
//!
//! ```ignore
//! use pointcloud_stats::device::{DeviceMirror, CudaAccelerator};
//!
//! let mut mirror = DeviceMirror::new(CudaAccelerator::new()?);
//! let (mean, covariance) = mirror.mean_and_covariance(&cloud)?;
//! mirror.release_all()?;
//! ```

#[cfg(feature = "cuda")]
mod cuda;
mod host;
#[cfg(feature = "cuda")]
pub mod kernels;
mod types;

#[cfg(feature = "cuda")]
pub use cuda::{CudaAccelerator, CudaBuffer};
pub use host::{HostAccelerator, HostBuffer};
pub use types::{DeviceError, MirrorArray, ReductionConfig};

use nalgebra::{Matrix3, Vector3};
use tracing::{debug, warn};

use crate::point_cloud::PointCloud;
use crate::statistics::Cumulants;

/// An owned block of accelerator memory holding `f64` values.
///
/// Dropping the buffer frees the device memory.
pub trait DeviceBuffer: Send {
    /// Number of `f64` elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accelerator capability used by [`DeviceMirror`].
pub trait Accelerator {
    type Buffer: DeviceBuffer;

    /// Allocate a buffer sized to `host` and copy `host` into it.
    fn upload(&self, host: &[f64]) -> Result<Self::Buffer, DeviceError>;

    /// Copy a buffer's contents back to the host.
    fn download(&self, buffer: &Self::Buffer) -> Result<Vec<f64>, DeviceError>;

    /// Reduce the first `count` points of a flattened `[N * 3]` buffer to
    /// the nine raw sums of [`Cumulants`].
    fn reduce_cumulants(&self, points: &Self::Buffer, count: usize)
        -> Result<Cumulants, DeviceError>;

    /// Free a buffer.
    fn free(&self, buffer: Self::Buffer) -> Result<(), DeviceError> {
        drop(buffer);
        Ok(())
    }
}

/// Device copies of a point cloud's arrays.
///
/// Host data is not tracked: callers refresh the mirror after mutating the
/// cloud. Refresh and release take `&mut self`, so no two device operations
/// on the same mirror can overlap.
pub struct DeviceMirror<A: Accelerator> {
    accelerator: A,
    points: Option<A::Buffer>,
    normals: Option<A::Buffer>,
    colors: Option<A::Buffer>,
}

impl<A: Accelerator> DeviceMirror<A> {
    /// Create a mirror with no resident buffers.
    pub fn new(accelerator: A) -> Self {
        Self {
            accelerator,
            points: None,
            normals: None,
            colors: None,
        }
    }

    pub fn accelerator(&self) -> &A {
        &self.accelerator
    }

    /// The resident buffer for `array`, if any.
    pub fn buffer(&self, array: MirrorArray) -> Option<&A::Buffer> {
        match array {
            MirrorArray::Points => self.points.as_ref(),
            MirrorArray::Normals => self.normals.as_ref(),
            MirrorArray::Colors => self.colors.as_ref(),
        }
    }

    pub fn is_resident(&self, array: MirrorArray) -> bool {
        self.buffer(array).is_some()
    }

    fn slot_mut(&mut self, array: MirrorArray) -> &mut Option<A::Buffer> {
        match array {
            MirrorArray::Points => &mut self.points,
            MirrorArray::Normals => &mut self.normals,
            MirrorArray::Colors => &mut self.colors,
        }
    }

    /// Replace the device copy of one array with the cloud's current data.
    ///
    /// The previous buffer is released before the new one is allocated. On
    /// failure the slot is left empty. An empty host array leaves the slot
    /// empty and succeeds.
    pub fn refresh(&mut self, array: MirrorArray, cloud: &PointCloud) -> Result<(), DeviceError> {
        self.release(array)?;

        let host = flatten(host_array(cloud, array));
        if host.is_empty() {
            return Ok(());
        }

        let buffer = self.accelerator.upload(&host)?;
        debug!("Uploaded {} {array} values to device", buffer.len());
        *self.slot_mut(array) = Some(buffer);
        Ok(())
    }

    pub fn refresh_points(&mut self, cloud: &PointCloud) -> Result<(), DeviceError> {
        self.refresh(MirrorArray::Points, cloud)
    }

    pub fn refresh_normals(&mut self, cloud: &PointCloud) -> Result<(), DeviceError> {
        self.refresh(MirrorArray::Normals, cloud)
    }

    pub fn refresh_colors(&mut self, cloud: &PointCloud) -> Result<(), DeviceError> {
        self.refresh(MirrorArray::Colors, cloud)
    }

    /// Refresh points, normals and colors.
    ///
    /// Every refresh is attempted even if an earlier one failed. Returns the
    /// first error, if any.
    pub fn refresh_all(&mut self, cloud: &PointCloud) -> Result<(), DeviceError> {
        let results = MirrorArray::ALL.map(|array| (array, self.refresh(array, cloud)));
        combine("refresh", results)
    }

    /// Free the device copy of one array.
    ///
    /// Releasing an array that is not resident succeeds.
    pub fn release(&mut self, array: MirrorArray) -> Result<(), DeviceError> {
        match self.slot_mut(array).take() {
            Some(buffer) => {
                debug!("Releasing {array} buffer ({} values)", buffer.len());
                self.accelerator.free(buffer)
            }
            None => Ok(()),
        }
    }

    pub fn release_points(&mut self) -> Result<(), DeviceError> {
        self.release(MirrorArray::Points)
    }

    pub fn release_normals(&mut self) -> Result<(), DeviceError> {
        self.release(MirrorArray::Normals)
    }

    pub fn release_colors(&mut self) -> Result<(), DeviceError> {
        self.release(MirrorArray::Colors)
    }

    /// Release all three arrays; every release is attempted.
    pub fn release_all(&mut self) -> Result<(), DeviceError> {
        let results = MirrorArray::ALL.map(|array| (array, self.release(array)));
        combine("release", results)
    }

    /// Copy a resident array back to the host.
    pub fn download(&self, array: MirrorArray) -> Result<Vec<Vector3<f64>>, DeviceError> {
        let buffer = self.buffer(array).ok_or(DeviceError::NotResident(array))?;
        let flat = self.accelerator.download(buffer)?;
        Ok(flat
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect())
    }

    /// Mean and covariance computed on the device.
    ///
    /// Refreshes the points mirror, reduces it on the device and finalizes
    /// the sums exactly like [`crate::statistics::compute_mean_and_covariance`].
    /// An empty cloud releases the points mirror and yields `(0, I)`.
    pub fn mean_and_covariance(
        &mut self,
        cloud: &PointCloud,
    ) -> Result<(Vector3<f64>, Matrix3<f64>), DeviceError> {
        self.refresh_points(cloud)?;
        if cloud.is_empty() {
            return Ok(Cumulants::new().finalize());
        }

        let buffer = self
            .points
            .as_ref()
            .ok_or(DeviceError::NotResident(MirrorArray::Points))?;
        let cumulants = self.accelerator.reduce_cumulants(buffer, cloud.len())?;

        Ok(cumulants.finalize())
    }
}

/// Mean and covariance of `cloud`, reduced on `mirror`'s accelerator.
pub fn compute_mean_and_covariance_device<A: Accelerator>(
    cloud: &PointCloud,
    mirror: &mut DeviceMirror<A>,
) -> Result<(Vector3<f64>, Matrix3<f64>), DeviceError> {
    mirror.mean_and_covariance(cloud)
}

fn host_array(cloud: &PointCloud, array: MirrorArray) -> &[Vector3<f64>] {
    match array {
        MirrorArray::Points => &cloud.points,
        MirrorArray::Normals => &cloud.normals,
        MirrorArray::Colors => &cloud.colors,
    }
}

/// Flatten to `[x0, y0, z0, x1, y1, z1, ...]`.
fn flatten(values: &[Vector3<f64>]) -> Vec<f64> {
    values.iter().flat_map(|v| v.iter().copied()).collect()
}

fn combine(
    operation: &str,
    results: [(MirrorArray, Result<(), DeviceError>); 3],
) -> Result<(), DeviceError> {
    let mut first_error = None;
    for (array, result) in results {
        if let Err(e) = result {
            warn!("Device {operation} of {array} failed: {e}");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
