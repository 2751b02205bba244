//! Buffers scoped to a single device operation.

use super::{AccessMode, Buffer, BufferInit, Device, DeviceError, KernelArg};

/// Position of a buffer inside a [`BufferSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSlot(usize);

/// Buffers allocated for one device operation.
///
/// Created by [`Device::with_buffers`], which frees (and therefore
/// overwrites) every buffer in the set once the operation finishes,
/// whether it succeeded or not.
#[derive(Debug, Default)]
pub struct BufferSet {
    buffers: Vec<Buffer>,
}

impl BufferSet {
    /// Allocates a buffer on `device` and tracks it.
    pub fn allocate(
        &mut self,
        device: &mut Device,
        init: BufferInit<'_>,
        access: AccessMode,
    ) -> Result<BufferSlot, DeviceError> {
        let buffer = device.allocate(init, access)?;
        self.buffers.push(buffer);
        Ok(BufferSlot(self.buffers.len() - 1))
    }

    /// Returns the buffer in `slot`.
    pub fn get(&self, slot: BufferSlot) -> &Buffer {
        &self.buffers[slot.0]
    }

    /// Kernel argument referring to the buffer in `slot`.
    pub fn arg(&self, slot: BufferSlot) -> KernelArg<'_> {
        KernelArg::Buffer(self.get(slot))
    }

    /// Number of tracked buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub(crate) fn free_all(&mut self, device: &mut Device) {
        for buffer in self.buffers.drain(..) {
            device.free(buffer);
        }
    }
}
