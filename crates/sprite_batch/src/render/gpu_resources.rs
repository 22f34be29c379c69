//! Scoped ownership of device objects
//!
//! Every device object the sprite renderer creates is wrapped in an owning
//! handle whose `Drop` releases it, so partially completed initialization and
//! shutdown both release exactly what was created.
//!
//! [`BufferLock`] pairs each successful [`GraphicsDevice::lock_buffer`] with
//! exactly one [`GraphicsDevice::unlock_buffer`], on every path.

use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use bytemuck::Pod;

use crate::render::api::{
    BufferDesc, BufferId, DeclarationId, DeviceError, DeviceResult, GraphicsDevice, LockFlags,
    VertexElement,
};

/// Owned vertex declaration
pub struct VertexDeclaration {
    device: Rc<dyn GraphicsDevice>,
    id: DeclarationId,
}

impl VertexDeclaration {
    /// Create a declaration on `device`
    pub fn new(device: &Rc<dyn GraphicsDevice>, elements: &[VertexElement]) -> DeviceResult<Self> {
        let id = device.create_vertex_declaration(elements)?;
        Ok(Self { device: Rc::clone(device), id })
    }

    /// Device handle
    pub fn id(&self) -> DeclarationId {
        self.id
    }
}

impl Drop for VertexDeclaration {
    fn drop(&mut self) {
        log::trace!("Releasing vertex declaration {:?}", self.id);
        self.device.release_vertex_declaration(self.id);
    }
}

/// Owned vertex or index buffer
pub struct GpuBuffer {
    device: Rc<dyn GraphicsDevice>,
    id: BufferId,
    desc: BufferDesc,
}

impl GpuBuffer {
    /// Create a buffer on `device`
    pub fn new(device: &Rc<dyn GraphicsDevice>, desc: BufferDesc) -> DeviceResult<Self> {
        let id = device.create_buffer(&desc)?;
        Ok(Self { device: Rc::clone(device), id, desc })
    }

    /// Device handle
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Lock `staging.len()` elements starting at element `first`
    ///
    /// `staging` is the CPU-side region the caller fills; its contents are
    /// handed to the device when the returned guard is unlocked or dropped.
    pub fn lock<'a, T: Pod>(
        &'a self,
        staging: &'a mut [T],
        first: usize,
        flags: LockFlags,
    ) -> DeviceResult<BufferLock<'a, T>> {
        let element_size = std::mem::size_of::<T>();
        let offset = first * element_size;
        let len = staging.len() * element_size;

        if offset + len > self.desc.size_bytes {
            return Err(DeviceError::OutOfRange {
                offset,
                len,
                capacity: self.desc.size_bytes,
            });
        }

        self.device.lock_buffer(self.id, offset, len, flags)?;
        Ok(BufferLock {
            buffer: self,
            data: staging,
            unlocked: false,
        })
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        log::trace!("Releasing buffer {:?} ({} bytes)", self.id, self.desc.size_bytes);
        self.device.release_buffer(self.id);
    }
}

/// Write access to a locked buffer range
///
/// Dereferences to the staging slice. Call [`BufferLock::unlock`] to observe
/// the unlock result; dropping the guard unlocks and logs any failure.
pub struct BufferLock<'a, T: Pod> {
    buffer: &'a GpuBuffer,
    data: &'a mut [T],
    unlocked: bool,
}

impl<T: Pod> BufferLock<'_, T> {
    /// Commit the written data and release the lock
    pub fn unlock(mut self) -> DeviceResult<()> {
        self.commit()
    }

    fn commit(&mut self) -> DeviceResult<()> {
        self.unlocked = true;
        self.buffer
            .device
            .unlock_buffer(self.buffer.id, bytemuck::cast_slice(&*self.data))
    }
}

impl<T: Pod> Deref for BufferLock<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &*self.data
    }
}

impl<T: Pod> DerefMut for BufferLock<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }
}

impl<T: Pod> Drop for BufferLock<'_, T> {
    fn drop(&mut self) {
        if !self.unlocked {
            if let Err(e) = self.commit() {
                log::error!("Unlock of buffer {:?} failed: {}", self.buffer.id, e);
            }
        }
    }
}
