//! Graphics device abstraction for the sprite renderer
//!
//! This module defines the trait a graphics device must implement so the
//! sprite renderer can create its buffers, fill them and issue draws. Device
//! and context creation live outside this crate; only buffer *usage* is
//! described here.
//!
//! ## Buffer locking
//!
//! `lock_buffer` reserves a byte range of a buffer for writing and
//! `unlock_buffer` hands the written bytes back to the device. Every
//! successful lock must be followed by exactly one unlock; a failed lock has
//! no matching unlock. The renderer enforces this through
//! [`BufferLock`](crate::render::gpu_resources::BufferLock).

use std::fmt;

use bitflags::bitflags;

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Handle to a vertex or index buffer owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Handle to a vertex declaration owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub u64);

bitflags! {
    /// Buffer creation hints
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Contents are rewritten frequently
        const DYNAMIC = 1 << 0;
        /// CPU never reads the contents back
        const WRITE_ONLY = 1 << 1;
    }
}

bitflags! {
    /// Flags for [`GraphicsDevice::lock_buffer`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LockFlags: u32 {
        /// Previous contents may be thrown away; the device can hand back a
        /// fresh region instead of waiting on in-flight reads
        const DISCARD = 1 << 0;
    }
}

/// Memory pool a buffer is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryPool {
    /// Driver-chosen, usually video memory; lost on device reset
    Default,
    /// Backed by a system-memory copy the driver restores automatically
    Managed,
}

/// Element width of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices
    U16,
}

impl IndexFormat {
    /// Size of one index in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::U16 => 2,
        }
    }
}

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Vertex stream data
    Vertex,
    /// Index data of the given width
    Index(IndexFormat),
}

/// Parameters for [`GraphicsDevice::create_buffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Vertex or index buffer
    pub kind: BufferKind,
    /// Total size in bytes
    pub size_bytes: usize,
    /// Usage hints
    pub usage: BufferUsage,
    /// Memory pool
    pub pool: MemoryPool,
}

/// Component type of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Two 32-bit floats
    Float2,
    /// Three 32-bit floats
    Float3,
}

/// Semantic of a vertex element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementUsage {
    /// Vertex position
    Position,
    /// Texture coordinate set
    TexCoord,
}

/// One entry of a vertex declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Vertex stream the element is read from
    pub stream: u16,
    /// Byte offset inside the vertex
    pub offset: u16,
    /// Component type
    pub element_type: ElementType,
    /// Semantic
    pub usage: ElementUsage,
    /// Semantic index (e.g. texcoord set)
    pub usage_index: u8,
}

/// Parameters of an indexed triangle-list draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawIndexed {
    /// Value added to every index before fetching vertices
    pub base_vertex: i32,
    /// Lowest vertex index referenced by the draw
    pub min_vertex_index: u32,
    /// Number of vertices referenced, starting at `min_vertex_index`
    pub num_vertices: u32,
    /// First index read from the index buffer
    pub start_index: u32,
    /// Number of triangles
    pub primitive_count: u32,
}

/// Device operations, used for diagnostics and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    /// Vertex declaration creation
    CreateVertexDeclaration,
    /// Buffer creation
    CreateBuffer,
    /// Buffer lock
    LockBuffer,
    /// Buffer unlock
    UnlockBuffer,
    /// Vertex stream binding
    SetStreamSource,
    /// Vertex declaration binding
    SetVertexDeclaration,
    /// Index buffer binding
    SetIndices,
    /// Indexed draw
    DrawIndexedPrimitive,
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateVertexDeclaration => "CreateVertexDeclaration",
            Self::CreateBuffer => "CreateBuffer",
            Self::LockBuffer => "LockBuffer",
            Self::UnlockBuffer => "UnlockBuffer",
            Self::SetStreamSource => "SetStreamSource",
            Self::SetVertexDeclaration => "SetVertexDeclaration",
            Self::SetIndices => "SetIndices",
            Self::DrawIndexedPrimitive => "DrawIndexedPrimitive",
        };
        f.write_str(name)
    }
}

/// Effect operations, used for diagnostics and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectOp {
    /// Uniform or texture upload
    SetParameter,
    /// Effect begin
    Begin,
    /// Pass begin
    BeginPass,
    /// Pass end
    EndPass,
    /// Effect end
    End,
}

impl fmt::Display for EffectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetParameter => "SetParameter",
            Self::Begin => "Begin",
            Self::BeginPass => "BeginPass",
            Self::EndPass => "EndPass",
            Self::End => "End",
        };
        f.write_str(name)
    }
}

/// Errors reported by devices and effects
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    /// A device call failed
    #[error("{op} failed: {reason}")]
    Failed {
        /// Operation that failed
        op: DeviceOp,
        /// Driver message
        reason: String,
    },

    /// A handle does not name a live object
    #[error("Unknown {kind} handle {id}")]
    InvalidHandle {
        /// Object kind
        kind: &'static str,
        /// Raw handle value
        id: u64,
    },

    /// Buffer locked twice without unlock
    #[error("Buffer {0:?} is already locked")]
    AlreadyLocked(BufferId),

    /// Unlock without a matching lock
    #[error("Buffer {0:?} is not locked")]
    NotLocked(BufferId),

    /// Lock or write outside the buffer
    #[error("Range of {len} bytes at offset {offset} exceeds {capacity} bytes")]
    OutOfRange {
        /// Start of the range
        offset: usize,
        /// Length of the range
        len: usize,
        /// Size available
        capacity: usize,
    },

    /// An effect call failed
    #[error("Effect `{effect}`: {op} failed: {reason}")]
    Effect {
        /// Effect name
        effect: String,
        /// Operation that failed
        op: EffectOp,
        /// Driver message
        reason: String,
    },
}

/// Graphics device used by the sprite renderer
///
/// All methods take `&self`: devices are shared between the renderer and the
/// scoped handles that release their objects, and are expected to use
/// interior mutability the way native device interfaces do.
pub trait GraphicsDevice {
    /// Create a vertex declaration from its elements
    fn create_vertex_declaration(&self, elements: &[VertexElement]) -> DeviceResult<DeclarationId>;

    /// Create a vertex or index buffer
    fn create_buffer(&self, desc: &BufferDesc) -> DeviceResult<BufferId>;

    /// Reserve `size` bytes at `offset` of `buffer` for writing
    fn lock_buffer(&self, buffer: BufferId, offset: usize, size: usize, flags: LockFlags) -> DeviceResult<()>;

    /// Commit the bytes written into the locked range and release the lock
    ///
    /// `data` is written starting at the locked offset and may be shorter
    /// than the locked range.
    fn unlock_buffer(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()>;

    /// Bind a vertex buffer to a stream
    fn set_stream_source(&self, stream: u32, buffer: BufferId, offset: usize, stride: usize) -> DeviceResult<()>;

    /// Bind a vertex declaration
    fn set_vertex_declaration(&self, declaration: DeclarationId) -> DeviceResult<()>;

    /// Bind an index buffer
    fn set_indices(&self, buffer: BufferId) -> DeviceResult<()>;

    /// Issue an indexed triangle-list draw
    fn draw_indexed_primitive(&self, draw: &DrawIndexed) -> DeviceResult<()>;

    /// Destroy a vertex declaration
    fn release_vertex_declaration(&self, declaration: DeclarationId);

    /// Destroy a buffer
    fn release_buffer(&self, buffer: BufferId);
}
