//! Parallel compute devices.
//!
//! A device launches many lightweight work-items over buffers living in
//! device memory. Two implementations exist:
//!
//! - [`HostBackend`]: executes kernels on host threads via `rayon`, always
//!   available, exposed as a CPU-class device.
//! - `WgpuBackend` (feature `gpu`): executes the WGSL kernels on a GPU.
//!
//! Every call is synchronous from the caller's point of view: launches and
//! read-backs block until the device signals completion.

mod buffers;
mod handle;
mod host;
mod platform;
mod program;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use buffers::{BufferSet, BufferSlot};
pub use handle::{Device, DeviceStats};
pub use host::{HostBackend, HostPlatform};
pub use platform::{acquire_device, default_platforms, Platform};
pub use program::{KernelParam, KernelSignature, ParamKind, Program};
#[cfg(feature = "gpu")]
pub use wgpu_backend::{WgpuBackend, WgpuPlatform};

use thiserror::Error;

/// Errors raised by compute devices.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no compatible compute device available")]
    NoDeviceAvailable,
    #[error("kernel program failed to build: {0}")]
    Compile(String),
    #[error("device execution failed: {0}")]
    Execution(String),
}

impl DeviceError {
    /// Stable category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            DeviceError::NoDeviceAvailable => "NoDeviceAvailable",
            DeviceError::Compile(_) => "CompileError",
            DeviceError::Execution(_) => "BackendExecutionError",
        }
    }
}

/// Class of a compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Discrete, integrated or virtual GPU.
    Gpu,
    /// CPU or software rasterizer.
    Cpu,
    /// Anything the platform could not classify.
    Other,
}

/// Description of a device offered by a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device class used for selection.
    pub kind: DeviceKind,
    /// Name of the platform offering the device.
    pub platform: String,
    /// Position of the device within its platform.
    pub index: usize,
}

/// How a kernel may access a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Initial contents of a new device buffer.
#[derive(Debug, Clone, Copy)]
pub enum BufferInit<'a> {
    /// Copy host data to the device at allocation.
    Data(&'a [u8]),
    /// Allocate this many zeroed bytes.
    Zeroed(usize),
}

impl BufferInit<'_> {
    /// Length of the buffer in bytes.
    pub fn len(&self) -> usize {
        match self {
            BufferInit::Data(data) => data.len(),
            BufferInit::Zeroed(len) => *len,
        }
    }

    /// Returns true for a zero-length buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a buffer in device memory.
///
/// Buffers are owned by the device that allocated them and must be returned
/// through [`Device::free`], which overwrites their contents.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    id: u64,
    len: usize,
    access: AccessMode,
}

impl Buffer {
    pub(crate) fn new(id: u64, len: usize, access: AccessMode) -> Self {
        Self { id, len, access }
    }

    /// Device-assigned identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Length in bytes as requested at allocation.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true for a zero-length buffer.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Access mode requested at allocation.
    #[inline]
    pub fn access(&self) -> AccessMode {
        self.access
    }
}

/// One argument of a kernel launch.
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    Buffer(&'a Buffer),
    Scalar(u32),
}

/// Operations every compute device implements.
///
/// Arguments reaching `launch` have already been checked against the
/// kernel's signature by [`Device`].
pub trait ComputeBackend: Send {
    /// Describes the device.
    fn info(&self) -> &DeviceInfo;

    /// Builds a kernel program, requiring the named entry points.
    fn load_program(&mut self, source: &str, kernels: &[&str]) -> Result<Program, DeviceError>;

    /// Allocates a device buffer.
    fn allocate(&mut self, init: BufferInit<'_>, access: AccessMode) -> Result<Buffer, DeviceError>;

    /// Runs `kernel` over `work_size` work-items and waits for completion.
    fn launch(
        &mut self,
        program: &Program,
        kernel: &KernelSignature,
        work_size: u32,
        args: &[KernelArg<'_>],
    ) -> Result<(), DeviceError>;

    /// Copies the first `host.len()` bytes of `buffer` to the host.
    fn read_back(&mut self, buffer: &Buffer, host: &mut [u8]) -> Result<(), DeviceError>;

    /// Overwrites and frees a buffer.
    fn free(&mut self, buffer: Buffer);

    /// Overwrites every remaining buffer and tears the device down.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_init_len() {
        assert_eq!(BufferInit::Data(&[1, 2, 3]).len(), 3);
        assert_eq!(BufferInit::Zeroed(16).len(), 16);
        assert!(BufferInit::Zeroed(0).is_empty());
    }
}
