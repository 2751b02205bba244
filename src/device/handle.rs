//! Scoped device handle.

use super::program::check_args;
use super::{
    AccessMode, Buffer, BufferInit, BufferSet, ComputeBackend, DeviceError, DeviceInfo, KernelArg,
    Program,
};

/// Counters describing device traffic since acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Programs built.
    pub programs_built: u64,
    /// Kernel launches that completed.
    pub kernel_launches: u64,
    /// Bytes copied host → device.
    pub bytes_to_device: u64,
    /// Bytes copied device → host.
    pub bytes_from_device: u64,
    /// Buffers overwritten and freed.
    pub buffers_wiped: u64,
}

/// An acquired compute device.
///
/// The device is released exactly once: explicitly through
/// [`Device::release`] or implicitly when the handle drops, including
/// during unwinding. Releasing an already released device is a no-op.
pub struct Device {
    backend: Option<Box<dyn ComputeBackend>>,
    info: DeviceInfo,
    stats: DeviceStats,
}

impl Device {
    /// Wraps an opened backend.
    pub fn new(backend: Box<dyn ComputeBackend>) -> Self {
        let info = backend.info().clone();
        Self {
            backend: Some(backend),
            info,
            stats: DeviceStats::default(),
        }
    }

    /// Describes the device.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Traffic counters since acquisition.
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Returns true once the device has been released.
    pub fn is_released(&self) -> bool {
        self.backend.is_none()
    }

    fn backend(&mut self) -> Result<&mut (dyn ComputeBackend + 'static), DeviceError> {
        self.backend
            .as_deref_mut()
            .ok_or_else(|| DeviceError::Execution("device already released".to_string()))
    }

    /// Builds a kernel program declaring every entry point in `kernels`.
    pub fn load_program(&mut self, source: &str, kernels: &[&str]) -> Result<Program, DeviceError> {
        let program = self.backend()?.load_program(source, kernels)?;
        self.stats.programs_built += 1;
        tracing::info!(
            device = %self.info.name,
            kernels = program.kernels().len(),
            "Kernel program built"
        );
        Ok(program)
    }

    /// Allocates a device buffer, copying host data synchronously if given.
    pub fn allocate(&mut self, init: BufferInit<'_>, access: AccessMode) -> Result<Buffer, DeviceError> {
        let buffer = self.backend()?.allocate(init, access)?;
        if let BufferInit::Data(data) = init {
            self.stats.bytes_to_device += data.len() as u64;
        }
        tracing::trace!(id = buffer.id(), bytes = buffer.len(), ?access, "Buffer allocated");
        Ok(buffer)
    }

    /// Launches `kernel` over `work_size` work-items and blocks until done.
    pub fn launch(
        &mut self,
        program: &Program,
        kernel: &str,
        work_size: u32,
        args: &[KernelArg<'_>],
    ) -> Result<(), DeviceError> {
        let signature = program.kernel(kernel).ok_or_else(|| {
            DeviceError::Execution(format!("kernel `{}` is not part of the program", kernel))
        })?;
        check_args(signature, args)?;
        if work_size == 0 {
            return Err(DeviceError::Execution(format!(
                "kernel `{}` launched with zero work-items",
                kernel
            )));
        }

        self.backend()?.launch(program, signature, work_size, args)?;
        self.stats.kernel_launches += 1;
        tracing::debug!(kernel, work_size, "Kernel completed");
        Ok(())
    }

    /// Copies the first `host.len()` bytes of `buffer` to the host.
    pub fn read_back(&mut self, buffer: &Buffer, host: &mut [u8]) -> Result<(), DeviceError> {
        if host.len() > buffer.len() {
            return Err(DeviceError::Execution(format!(
                "read of {} bytes from a {}-byte buffer",
                host.len(),
                buffer.len()
            )));
        }
        self.backend()?.read_back(buffer, host)?;
        self.stats.bytes_from_device += host.len() as u64;
        Ok(())
    }

    /// Overwrites and frees a buffer. Buffers outliving a release are
    /// already wiped, so this is a no-op then.
    pub fn free(&mut self, buffer: Buffer) {
        if let Some(backend) = self.backend.as_deref_mut() {
            backend.free(buffer);
            self.stats.buffers_wiped += 1;
        }
    }

    /// Runs `op` with a [`BufferSet`] whose buffers are freed afterwards.
    pub fn with_buffers<T>(
        &mut self,
        op: impl FnOnce(&mut Device, &mut BufferSet) -> Result<T, DeviceError>,
    ) -> Result<T, DeviceError> {
        let mut set = BufferSet::default();
        let result = op(&mut *self, &mut set);
        set.free_all(self);
        result
    }

    /// Tears the device down. Safe to call any number of times.
    pub fn release(&mut self) {
        match self.backend.take() {
            Some(mut backend) => {
                backend.release();
                tracing::info!(device = %self.info.name, "Compute device released");
            }
            None => tracing::trace!(device = %self.info.name, "Device already released"),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("info", &self.info)
            .field("released", &self.is_released())
            .field("stats", &self.stats)
            .finish()
    }
}
