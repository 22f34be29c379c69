//! Public rendering API
//!
//! The seams between the sprite renderer and its collaborators: the graphics
//! device, the resource manager and the effects it hands out.

pub mod device;
pub mod resources;

// Re-export commonly used types
pub use device::{
    GraphicsDevice, DeviceResult, DeviceError, DeviceOp, EffectOp,
    BufferId, DeclarationId, BufferDesc, BufferKind, BufferUsage, LockFlags, MemoryPool,
    IndexFormat, VertexElement, ElementType, ElementUsage, DrawIndexed,
};
pub use resources::{Effect, ResourceManager, TextureId, EffectId, TextureHandle};
