//! CubeCL CUDA accelerator.
//!
//! Buffers are CubeCL handles; the memory is returned to the client's pool
//! when the last handle is dropped.

use anyhow::Result;
use cubecl::client::ComputeClient;
use cubecl::cuda::{CudaDevice, CudaRuntime};
use cubecl::prelude::*;
use cubecl::server::Handle;
use tracing::debug;

use super::kernels::cumulant_partials_kernel;
use super::types::{DeviceError, ReductionConfig};
use super::{Accelerator, DeviceBuffer};
use crate::statistics::{Cumulants, NUM_CUMULANTS};

/// Type alias for CUDA compute client
type CudaClient = ComputeClient<<CudaRuntime as Runtime>::Server>;

/// Accelerator running on a CUDA device through CubeCL.
///
/// CubeCL allocations are infallible from the caller's side: exhausting
/// device memory panics inside the runtime instead of returning
/// [`DeviceError::AllocationFailed`]. Only buffers whose length exceeds the
/// `u32` kernel index range are rejected with an error.
#[derive(Clone)]
pub struct CudaAccelerator {
    /// CUDA device (kept alive for runtime lifetime)
    #[allow(dead_code)]
    device: CudaDevice,
    client: CudaClient,
    config: ReductionConfig,
}

impl CudaAccelerator {
    /// Create an accelerator on the default CUDA device.
    pub fn new() -> Result<Self> {
        Self::with_device_id(0)
    }

    /// Create an accelerator on a specific CUDA device.
    pub fn with_device_id(device_id: usize) -> Result<Self> {
        let device = CudaDevice::new(device_id);
        let client = CudaRuntime::client(&device);
        debug!("CUDA accelerator initialized on device {device_id}");

        Ok(Self {
            device,
            client,
            config: ReductionConfig::default(),
        })
    }

    /// Override the reduction launch geometry.
    pub fn with_config(mut self, config: ReductionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client(&self) -> &CudaClient {
        &self.client
    }
}

/// Device buffer of `f64` values.
pub struct CudaBuffer {
    handle: Handle,
    len: usize,
}

impl DeviceBuffer for CudaBuffer {
    fn len(&self) -> usize {
        self.len
    }
}

/// Kernels index with `u32`.
fn check_index_range(len: usize) -> Result<u32, DeviceError> {
    u32::try_from(len).map_err(|_| DeviceError::AllocationFailed {
        bytes: len.saturating_mul(std::mem::size_of::<f64>()),
        reason: format!("{len} elements exceed the u32 index range"),
    })
}

impl Accelerator for CudaAccelerator {
    type Buffer = CudaBuffer;

    fn upload(&self, host: &[f64]) -> Result<CudaBuffer, DeviceError> {
        check_index_range(host.len())?;
        let handle = self.client.create(f64::as_bytes(host));
        Ok(CudaBuffer {
            handle,
            len: host.len(),
        })
    }

    fn download(&self, buffer: &CudaBuffer) -> Result<Vec<f64>, DeviceError> {
        let bytes = self.client.read_one(buffer.handle.clone());
        let values = f64::from_bytes(&bytes);
        if values.len() < buffer.len {
            return Err(DeviceError::CopyToHost(format!(
                "expected {} values, read {}",
                buffer.len,
                values.len()
            )));
        }
        Ok(values[..buffer.len].to_vec())
    }

    fn reduce_cumulants(&self, points: &CudaBuffer, count: usize) -> Result<Cumulants, DeviceError> {
        if count == 0 {
            return Ok(Cumulants::new());
        }
        if count * 3 > points.len {
            return Err(DeviceError::Reduction(format!(
                "{count} points requested but buffer holds {} values",
                points.len
            )));
        }

        let num_points = check_index_range(count * 3)? / 3;
        let points_per_thread = self.config.points_per_thread.max(1);
        let threads_per_cube = self.config.threads_per_cube.max(1);
        let num_partials = self.config.num_partials(count);

        let partials_gpu = self
            .client
            .empty(num_partials * NUM_CUMULANTS * std::mem::size_of::<f64>());

        let cube_count = (num_partials as u32).div_ceil(threads_per_cube);
        unsafe {
            cumulant_partials_kernel::launch_unchecked::<f64, CudaRuntime>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(threads_per_cube, 1, 1),
                ArrayArg::from_raw_parts::<f64>(&points.handle, points.len, 1),
                ScalarArg::new(num_points),
                ScalarArg::new(points_per_thread),
                ArrayArg::from_raw_parts::<f64>(&partials_gpu, num_partials * NUM_CUMULANTS, 1),
            );
        }

        // Read partial sums back and merge on the host
        let partials_bytes = self.client.read_one(partials_gpu);
        let partials = f64::from_bytes(&partials_bytes);
        if partials.len() < num_partials * NUM_CUMULANTS {
            return Err(DeviceError::CopyToHost(format!(
                "expected {} partial sums, read {}",
                num_partials * NUM_CUMULANTS,
                partials.len()
            )));
        }

        let mut sums = [0.0; NUM_CUMULANTS];
        for partial in partials[..num_partials * NUM_CUMULANTS].chunks_exact(NUM_CUMULANTS) {
            for (sum, value) in sums.iter_mut().zip(partial) {
                *sum += value;
            }
        }

        Ok(Cumulants::from_sums(sums, count))
    }
}
