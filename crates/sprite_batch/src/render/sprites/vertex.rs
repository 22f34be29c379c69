//! Sprite vertex format and the static quad index pattern

use bytemuck::{Pod, Zeroable};

use crate::render::api::{ElementType, ElementUsage, VertexElement};

/// Vertices per sprite quad
pub const VERTICES_PER_SPRITE: usize = 4;
/// Indices per sprite quad
pub const INDICES_PER_SPRITE: usize = 6;
/// Triangles per sprite quad
pub const PRIMITIVES_PER_SPRITE: usize = 2;

/// Screen-space sprite vertex: float3 position, float2 texcoord
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct SpriteVertex {
    /// Position in pixels, Y up from the bottom of the screen
    pub position: [f32; 3],
    /// Texture coordinate, V up from the bottom of the texture
    pub tex_coord: [f32; 2],
}

/// Bytes per [`SpriteVertex`]
pub const SPRITE_VERTEX_STRIDE: usize = std::mem::size_of::<SpriteVertex>();

impl SpriteVertex {
    /// Vertex on the z = 0 plane
    pub const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0],
            tex_coord: [u, v],
        }
    }

    /// Elements of the sprite vertex declaration
    pub fn elements() -> [VertexElement; 2] {
        [
            VertexElement {
                stream: 0,
                offset: 0,
                element_type: ElementType::Float3,
                usage: ElementUsage::Position,
                usage_index: 0,
            },
            VertexElement {
                stream: 0,
                offset: 12,
                element_type: ElementType::Float2,
                usage: ElementUsage::TexCoord,
                usage_index: 0,
            },
        ]
    }
}

/// Index list for `quads` quads: `k, k+1, k+3, k+3, k+1, k+2` with `k = 4 * quad`
///
/// Callers keep `quads` within 16-bit addressing.
pub fn quad_indices(quads: usize) -> Vec<u16> {
    let mut indices = Vec::with_capacity(quads * INDICES_PER_SPRITE);
    for quad in 0..quads {
        let k = (quad * VERTICES_PER_SPRITE) as u16;
        indices.extend_from_slice(&[k, k + 1, k + 3, k + 3, k + 1, k + 2]);
    }
    indices
}
