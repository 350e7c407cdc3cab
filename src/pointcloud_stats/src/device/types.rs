//! Type definitions shared by the device mirror and its backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by accelerator backends.
///
/// Device failures are always returned, never raised; the caller decides
/// whether to fall back to the CPU path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device allocation of {bytes} bytes failed: {reason}")]
    AllocationFailed { bytes: usize, reason: String },
    #[error("host to device copy failed: {0}")]
    CopyToDevice(String),
    #[error("device to host copy failed: {0}")]
    CopyToHost(String),
    #[error("device reduction failed: {0}")]
    Reduction(String),
    #[error("no {0} buffer is resident on the device")]
    NotResident(MirrorArray),
}

/// One of the three per-point arrays a cloud can mirror on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorArray {
    Points,
    Normals,
    Colors,
}

impl MirrorArray {
    /// Refresh and release order.
    pub const ALL: [MirrorArray; 3] = [
        MirrorArray::Points,
        MirrorArray::Normals,
        MirrorArray::Colors,
    ];
}

impl fmt::Display for MirrorArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorArray::Points => "points",
            MirrorArray::Normals => "normals",
            MirrorArray::Colors => "colors",
        };
        f.write_str(name)
    }
}

/// Launch geometry for the cumulant reduction.
///
/// Each worker reduces `points_per_thread` consecutive points into nine
/// partial sums; partials are merged on the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReductionConfig {
    /// Threads per cube (CUDA block size).
    pub threads_per_cube: u32,
    /// Consecutive points reduced by one thread.
    pub points_per_thread: u32,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            threads_per_cube: 256,
            points_per_thread: 64,
        }
    }
}

impl ReductionConfig {
    /// Number of partial sums produced for `num_points` points.
    pub fn num_partials(&self, num_points: usize) -> usize {
        num_points.div_ceil(self.points_per_thread.max(1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_config_default() {
        let config = ReductionConfig::default();
        assert_eq!(config.threads_per_cube, 256);
        assert_eq!(config.points_per_thread, 64);
    }

    #[test]
    fn test_num_partials() {
        let config = ReductionConfig {
            points_per_thread: 10,
            ..Default::default()
        };
        assert_eq!(config.num_partials(0), 0);
        assert_eq!(config.num_partials(10), 1);
        assert_eq!(config.num_partials(11), 2);
    }

    #[test]
    fn test_error_display() {
        let err = DeviceError::NotResident(MirrorArray::Normals);
        assert_eq!(err.to_string(), "no normals buffer is resident on the device");
    }
}
