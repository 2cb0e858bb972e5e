//! Compute devices the pool binds its workers to.

use std::num::NonZeroUsize;
use std::thread;

use crate::types::ScanError;

/// One compute device: an index and the number of threads bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub index: usize,
    pub threads: usize,
}

impl Device {
    /// Builds the private thread pool a worker runs its jobs on.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] if the pool cannot be created.
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, ScanError> {
        let index = self.index;
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads.max(1))
            .thread_name(move |thread| format!("bindscan-dev{}-{}", index, thread))
            .build()
            .map_err(|e| {
                ScanError::Configuration(format!(
                    "Failed to configure thread pool for device {}: {}",
                    index, e
                ))
            })
    }
}

/// Supplies the ordered list of usable devices; the pool has one worker per
/// device.
pub trait DeviceProvider: Send + Sync {
    fn devices(&self) -> Result<Vec<Device>, ScanError>;
}

/// CPU cores split into equal devices.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::worker::device::{CpuDevices, DeviceProvider};
///
/// let devices = CpuDevices::new(Some(2)).with_threads(Some(3)).devices()?;
/// assert_eq!(devices.len(), 2);
/// assert_eq!(devices[1].index, 1);
/// assert_eq!(devices[1].threads, 3);
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuDevices {
    count: Option<usize>,
    threads: Option<usize>,
}

impl CpuDevices {
    /// `count` devices, or one per available core when `None`
    pub fn new(count: Option<usize>) -> Self {
        Self {
            count,
            threads: None,
        }
    }

    /// Threads per device; by default the available cores are shared evenly
    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }
}

impl DeviceProvider for CpuDevices {
    fn devices(&self) -> Result<Vec<Device>, ScanError> {
        let cores = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let count = self.count.unwrap_or(cores);
        if count == 0 {
            return Err(ScanError::Configuration(
                "at least one device is required".to_string(),
            ));
        }
        let threads = self.threads.unwrap_or_else(|| (cores / count).max(1));
        if threads == 0 {
            return Err(ScanError::Configuration(
                "threads per device must be at least 1".to_string(),
            ));
        }
        Ok((0..count).map(|index| Device { index, threads }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detected_devices_cover_cores() {
        let devices = CpuDevices::default().devices().unwrap();
        assert!(!devices.is_empty());
        assert!(devices.iter().all(|d| d.threads >= 1));
        let indices: Vec<usize> = devices.iter().map(|d| d.index).collect();
        assert_eq!(indices, (0..devices.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_devices_rejected() {
        assert!(matches!(
            CpuDevices::new(Some(0)).devices(),
            Err(ScanError::Configuration(_))
        ));
        assert!(CpuDevices::new(Some(1)).with_threads(Some(0)).devices().is_err());
    }

    #[test]
    fn test_device_pool_has_requested_threads() {
        let device = Device { index: 3, threads: 2 };
        let pool = device.build_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
