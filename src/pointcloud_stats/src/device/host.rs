//! Host-memory accelerator.
//!
//! Emulates a device with ordinary heap buffers. Useful on machines without
//! a GPU and for exercising the mirror lifecycle: every buffer is recorded in
//! a shared ledger, and an optional byte budget makes allocation failures
//! reproducible.

use std::sync::Arc;

use nalgebra::Vector3;
use parking_lot::Mutex;
use rayon::prelude::*;

use super::types::{DeviceError, ReductionConfig};
use super::{Accelerator, DeviceBuffer};
use crate::statistics::Cumulants;

/// Allocation accounting shared by an accelerator and its buffers.
#[derive(Debug, Default)]
struct Ledger {
    live_buffers: usize,
    live_bytes: usize,
    peak_bytes: usize,
    total_allocations: usize,
}

/// Accelerator backed by host memory.
///
/// Clones share the same ledger and budget.
#[derive(Debug, Clone, Default)]
pub struct HostAccelerator {
    ledger: Arc<Mutex<Ledger>>,
    budget_bytes: Option<usize>,
    config: ReductionConfig,
}

impl HostAccelerator {
    /// Create an accelerator with unlimited memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accelerator that refuses allocations once `bytes` are live.
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget_bytes: Some(bytes),
            ..Default::default()
        }
    }

    /// Create an accelerator with a custom reduction partitioning.
    pub fn with_config(config: ReductionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Number of buffers currently allocated.
    pub fn live_buffers(&self) -> usize {
        self.ledger.lock().live_buffers
    }

    /// Bytes currently allocated.
    pub fn live_bytes(&self) -> usize {
        self.ledger.lock().live_bytes
    }

    /// Largest number of bytes allocated at once.
    pub fn peak_bytes(&self) -> usize {
        self.ledger.lock().peak_bytes
    }

    /// Number of successful allocations since creation.
    pub fn total_allocations(&self) -> usize {
        self.ledger.lock().total_allocations
    }
}

/// Heap buffer registered in a [`HostAccelerator`] ledger.
#[derive(Debug)]
pub struct HostBuffer {
    data: Vec<f64>,
    ledger: Arc<Mutex<Ledger>>,
}

impl DeviceBuffer for HostBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock();
        ledger.live_buffers -= 1;
        ledger.live_bytes -= std::mem::size_of_val(self.data.as_slice());
    }
}

impl Accelerator for HostAccelerator {
    type Buffer = HostBuffer;

    fn upload(&self, host: &[f64]) -> Result<HostBuffer, DeviceError> {
        let bytes = std::mem::size_of_val(host);
        {
            let mut ledger = self.ledger.lock();
            if let Some(budget) = self.budget_bytes {
                if ledger.live_bytes + bytes > budget {
                    return Err(DeviceError::AllocationFailed {
                        bytes,
                        reason: format!(
                            "budget of {budget} bytes exceeded ({} bytes live)",
                            ledger.live_bytes
                        ),
                    });
                }
            }
            ledger.live_buffers += 1;
            ledger.live_bytes += bytes;
            ledger.peak_bytes = ledger.peak_bytes.max(ledger.live_bytes);
            ledger.total_allocations += 1;
        }

        Ok(HostBuffer {
            data: host.to_vec(),
            ledger: Arc::clone(&self.ledger),
        })
    }

    fn download(&self, buffer: &HostBuffer) -> Result<Vec<f64>, DeviceError> {
        Ok(buffer.data.clone())
    }

    fn reduce_cumulants(&self, points: &HostBuffer, count: usize) -> Result<Cumulants, DeviceError> {
        let needed = count * 3;
        if needed > points.data.len() {
            return Err(DeviceError::Reduction(format!(
                "{count} points requested but buffer holds {} values",
                points.data.len()
            )));
        }

        // One partial per worker range, merged afterwards
        let chunk = self.config.points_per_thread.max(1) as usize * 3;
        let cumulants = points.data[..needed]
            .par_chunks(chunk)
            .map(|range| {
                let mut partial = Cumulants::new();
                for p in range.chunks_exact(3) {
                    partial.add_point(&Vector3::new(p[0], p[1], p[2]));
                }
                partial
            })
            .reduce(Cumulants::new, |mut a, b| {
                a.merge(&b);
                a
            });

        Ok(cumulants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_tracks_buffers() {
        let accelerator = HostAccelerator::new();
        let a = accelerator.upload(&[1.0, 2.0, 3.0]).unwrap();
        let b = accelerator.upload(&[4.0; 6]).unwrap();
        assert_eq!(accelerator.live_buffers(), 2);
        assert_eq!(accelerator.live_bytes(), 9 * 8);

        drop(a);
        assert_eq!(accelerator.live_buffers(), 1);
        assert_eq!(accelerator.live_bytes(), 6 * 8);

        accelerator.free(b).unwrap();
        assert_eq!(accelerator.live_buffers(), 0);
        assert_eq!(accelerator.peak_bytes(), 9 * 8);
        assert_eq!(accelerator.total_allocations(), 2);
    }

    #[test]
    fn test_budget_rejects_allocation() {
        let accelerator = HostAccelerator::with_budget(16);
        assert!(accelerator.upload(&[1.0, 2.0]).is_ok());
        let err = accelerator.upload(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, DeviceError::AllocationFailed { bytes: 24, .. }));
        assert_eq!(accelerator.live_buffers(), 0);
    }

    #[test]
    fn test_download_roundtrip() {
        let accelerator = HostAccelerator::new();
        let buffer = accelerator.upload(&[1.5, -2.0, 3.25]).unwrap();
        assert_eq!(accelerator.download(&buffer).unwrap(), vec![1.5, -2.0, 3.25]);
    }

    #[test]
    fn test_reduce_counts_every_point() {
        let accelerator = HostAccelerator::with_config(ReductionConfig {
            threads_per_cube: 1,
            points_per_thread: 2,
        });
        let flat: Vec<f64> = (0..15).map(|i| i as f64).collect();
        let buffer = accelerator.upload(&flat).unwrap();
        let cumulants = accelerator.reduce_cumulants(&buffer, 5).unwrap();
        assert_eq!(cumulants.count, 5);
        assert_eq!(cumulants.sums[0], 0.0 + 3.0 + 6.0 + 9.0 + 12.0);
    }

    #[test]
    fn test_reduce_rejects_short_buffer() {
        let accelerator = HostAccelerator::new();
        let buffer = accelerator.upload(&[0.0; 6]).unwrap();
        assert!(matches!(
            accelerator.reduce_cumulants(&buffer, 3),
            Err(DeviceError::Reduction(_))
        ));
    }
}
