//! Platform discovery and device acquisition.

use super::{ComputeBackend, Device, DeviceError, DeviceInfo, DeviceKind, HostPlatform};

/// A source of compute devices (a driver stack, or the host itself).
pub trait Platform {
    /// Platform name used in logs.
    fn name(&self) -> &str;

    /// Devices this platform can open, in the platform's own order.
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Opens one of the devices returned by [`Platform::devices`].
    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn ComputeBackend>, DeviceError>;
}

/// Platforms available in this build, in search order.
pub fn default_platforms() -> Vec<Box<dyn Platform>> {
    let mut platforms: Vec<Box<dyn Platform>> = Vec::new();
    #[cfg(feature = "gpu")]
    platforms.push(Box::new(super::WgpuPlatform::new()));
    platforms.push(Box::new(HostPlatform::new()));
    platforms
}

/// Acquires the first suitable compute device.
///
/// GPU-class devices win: the first platform exposing at least one GPU is
/// chosen and its first GPU opened, with no further ranking. Only when no
/// platform has a GPU, and `allow_cpu_fallback` is set, is the first
/// CPU-class device taken the same way.
pub fn acquire_device(
    platforms: &[Box<dyn Platform>],
    allow_cpu_fallback: bool,
) -> Result<Device, DeviceError> {
    let wanted: &[DeviceKind] = if allow_cpu_fallback {
        &[DeviceKind::Gpu, DeviceKind::Cpu]
    } else {
        &[DeviceKind::Gpu]
    };

    for &kind in wanted {
        for platform in platforms {
            let Some(info) = platform.devices().into_iter().find(|d| d.kind == kind) else {
                continue;
            };

            tracing::info!(
                platform = platform.name(),
                device = %info.name,
                ?kind,
                "Selected compute device"
            );
            let backend = platform.open(&info)?;
            return Ok(Device::new(backend));
        }
    }

    tracing::warn!(
        platforms = platforms.len(),
        allow_cpu_fallback,
        "No compatible compute device found"
    );
    Err(DeviceError::NoDeviceAvailable)
}
