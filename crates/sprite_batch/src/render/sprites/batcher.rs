//! # Sprite Batcher
//!
//! Turns a buffer of queued jobs into draw calls.
//!
//! ## Draw Pass
//!
//! 1. Stable-sort jobs by [`SortKey`](super::SortKey)
//! 2. Fill the shared vertex buffer (discard lock) with every sprite in order
//! 3. Bind declaration, vertex stream and index buffer once
//! 4. Walk the jobs, changing effect, texture and alpha only when they differ
//!    from the previous job, and issue one indexed draw per job per pass
//!
//! Device failures never abort the pass: each one is logged and counted in
//! [`DrawStats::device_failures`], and the walk continues.

use std::rc::Rc;

use crate::core::config::UniformNames;
use crate::foundation::math::SpriteCamera;
use crate::render::api::{
    BufferDesc, BufferId, BufferKind, BufferUsage, DeclarationId, DeviceError, DrawIndexed,
    Effect, EffectId, GraphicsDevice, IndexFormat, LockFlags, MemoryPool, ResourceManager,
    TextureHandle, TextureId,
};
use crate::render::gpu_resources::{BufferLock, GpuBuffer, VertexDeclaration};
use crate::render::{RenderError, RenderResult};

use super::builder;
use super::job::RenderJob;
use super::vertex::{
    quad_indices, SpriteVertex, INDICES_PER_SPRITE, PRIMITIVES_PER_SPRITE, SPRITE_VERTEX_STRIDE,
    VERTICES_PER_SPRITE,
};

/// Counters for one draw pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Jobs drawn (or skipped) in the pass
    pub jobs: usize,
    /// Sprites written to the vertex buffer
    pub sprites: usize,
    /// Successful indexed draws
    pub draw_calls: usize,
    /// Effect changes
    pub effect_binds: usize,
    /// Texture changes
    pub texture_binds: usize,
    /// Alpha uploads
    pub alpha_uploads: usize,
    /// Jobs not drawn because their effect or texture did not resolve
    pub skipped_jobs: usize,
    /// Device and effect calls that failed
    pub device_failures: usize,
}

impl DrawStats {
    /// Average sprites per draw call
    pub fn sprites_per_draw(&self) -> f32 {
        if self.draw_calls == 0 {
            0.0
        } else {
            self.sprites as f32 / self.draw_calls as f32
        }
    }

    /// State changes issued in the pass
    pub fn state_changes(&self) -> usize {
        self.effect_binds + self.texture_binds + self.alpha_uploads
    }

    fn record_failure(&mut self, what: &str, error: &DeviceError) {
        log::error!("{what} failed: {error} [SpriteBatcher]");
        self.device_failures += 1;
    }
}

/// Vertex declaration, dynamic vertex buffer and static index buffer shared
/// by every draw pass
pub struct SpriteBuffers {
    device: Rc<dyn GraphicsDevice>,
    declaration: VertexDeclaration,
    vertices: GpuBuffer,
    indices: GpuBuffer,
    staging: Vec<SpriteVertex>,
}

impl SpriteBuffers {
    /// Create buffers for `capacity` sprites and fill the index buffer
    ///
    /// Objects created before a failing step are released on return.
    pub fn create(device: &Rc<dyn GraphicsDevice>, capacity: usize) -> RenderResult<Self> {
        let vertex_count = capacity * VERTICES_PER_SPRITE;
        let index_count = capacity * INDICES_PER_SPRITE;

        let declaration = VertexDeclaration::new(device, &SpriteVertex::elements())
            .map_err(|source| RenderError::InitializationFailed { stage: "vertex declaration", source })?;

        let vertices = GpuBuffer::new(
            device,
            BufferDesc {
                kind: BufferKind::Vertex,
                size_bytes: vertex_count * SPRITE_VERTEX_STRIDE,
                usage: BufferUsage::DYNAMIC | BufferUsage::WRITE_ONLY,
                pool: MemoryPool::Default,
            },
        )
        .map_err(|source| RenderError::InitializationFailed { stage: "vertex buffer", source })?;

        let indices = GpuBuffer::new(
            device,
            BufferDesc {
                kind: BufferKind::Index(IndexFormat::U16),
                size_bytes: index_count * IndexFormat::U16.size(),
                usage: BufferUsage::WRITE_ONLY,
                pool: MemoryPool::Managed,
            },
        )
        .map_err(|source| RenderError::InitializationFailed { stage: "index buffer", source })?;

        let mut index_data = quad_indices(capacity);
        indices
            .lock(&mut index_data, 0, LockFlags::empty())
            .and_then(BufferLock::unlock)
            .map_err(|source| RenderError::InitializationFailed { stage: "index upload", source })?;

        log::debug!(
            "Created sprite buffers: {} vertices, {} indices [SpriteBuffers::create]",
            vertex_count,
            index_count
        );

        Ok(Self {
            device: Rc::clone(device),
            declaration,
            vertices,
            indices,
            staging: vec![SpriteVertex::default(); vertex_count],
        })
    }

    /// Handle of the vertex declaration
    pub fn declaration_id(&self) -> DeclarationId {
        self.declaration.id()
    }

    /// Handle of the shared vertex buffer
    pub fn vertex_buffer_id(&self) -> BufferId {
        self.vertices.id()
    }

    /// Handle of the index buffer
    pub fn index_buffer_id(&self) -> BufferId {
        self.indices.id()
    }

    /// Number of sprites the buffers hold
    pub fn capacity(&self) -> usize {
        self.staging.len() / VERTICES_PER_SPRITE
    }

    /// Lock the first `vertex_count` vertices with discard, let `fill` write
    /// them and unlock
    fn upload(&mut self, vertex_count: usize, stats: &mut DrawStats, fill: impl FnOnce(&mut [SpriteVertex])) {
        let capacity = self.staging.len();
        let Some(staging) = self.staging.get_mut(..vertex_count) else {
            stats.record_failure(
                "Lock vertex buffer",
                &DeviceError::OutOfRange {
                    offset: 0,
                    len: vertex_count * SPRITE_VERTEX_STRIDE,
                    capacity: capacity * SPRITE_VERTEX_STRIDE,
                },
            );
            return;
        };

        match self.vertices.lock(staging, 0, LockFlags::DISCARD) {
            Ok(mut lock) => {
                fill(&mut *lock);
                if let Err(e) = lock.unlock() {
                    stats.record_failure("Unlock vertex buffer", &e);
                }
            }
            Err(e) => stats.record_failure("Lock vertex buffer", &e),
        }
    }

    fn bind(&self, stats: &mut DrawStats) {
        if let Err(e) = self.device.set_vertex_declaration(self.declaration.id()) {
            stats.record_failure("SetVertexDeclaration", &e);
        }
        if let Err(e) = self.device.set_stream_source(0, self.vertices.id(), 0, SPRITE_VERTEX_STRIDE) {
            stats.record_failure("SetStreamSource", &e);
        }
        if let Err(e) = self.device.set_indices(self.indices.id()) {
            stats.record_failure("SetIndices", &e);
        }
    }
}

/// Frame state a draw pass reads
pub struct DrawContext<'a> {
    /// Effect and texture lookup
    pub resources: &'a dyn ResourceManager,
    /// Matrices uploaded on every effect change
    pub camera: &'a SpriteCamera,
    /// Parameter names
    pub uniforms: &'a UniformNames,
    /// Viewport width in pixels
    pub screen_width: f32,
    /// Viewport height in pixels
    pub screen_height: f32,
}

impl DrawContext<'_> {
    fn bind_camera(&self, effect: &dyn Effect, stats: &mut DrawStats) {
        if let Err(e) = effect.set_matrix(&self.uniforms.projection, &self.camera.projection) {
            stats.record_failure("Set projection matrix", &e);
        }
        if let Err(e) = effect.set_matrix(&self.uniforms.view, &self.camera.view) {
            stats.record_failure("Set view matrix", &e);
        }
    }
}

/// Run every pass of `effect`, issuing `draw` once per pass
fn draw_passes(effect: &dyn Effect, device: &dyn GraphicsDevice, draw: &DrawIndexed, stats: &mut DrawStats) {
    let passes = match effect.begin() {
        Ok(passes) => passes,
        Err(e) => {
            stats.record_failure("Begin effect", &e);
            return;
        }
    };

    for pass in 0..passes {
        if let Err(e) = effect.begin_pass(pass) {
            stats.record_failure("Begin pass", &e);
            continue;
        }
        match device.draw_indexed_primitive(draw) {
            Ok(()) => stats.draw_calls += 1,
            Err(e) => stats.record_failure("DrawIndexedPrimitive", &e),
        }
        if let Err(e) = effect.end_pass() {
            stats.record_failure("End pass", &e);
        }
    }

    if let Err(e) = effect.end() {
        stats.record_failure("End effect", &e);
    }
}

/// Effect state carried between consecutive jobs
#[derive(Default)]
struct BoundState {
    effect_id: Option<EffectId>,
    effect: Option<Rc<dyn Effect>>,
    texture: Option<(TextureId, bool)>,
    alpha: Option<u32>,
}

/// Sort and draw `jobs`
///
/// Callers guarantee the jobs hold fewer sprites than the buffer capacity.
pub fn draw_jobs(buffers: &mut SpriteBuffers, context: &DrawContext<'_>, jobs: &mut [RenderJob]) -> DrawStats {
    let mut stats = DrawStats::default();
    if jobs.is_empty() {
        return stats;
    }

    jobs.sort_by_key(RenderJob::sort_key);

    stats.jobs = jobs.len();
    stats.sprites = jobs.iter().map(RenderJob::sprite_count).sum();

    let screen_height = context.screen_height;
    buffers.upload(stats.sprites * VERTICES_PER_SPRITE, &mut stats, |out| {
        builder::write_jobs(jobs.iter(), screen_height, out);
    });
    buffers.bind(&mut stats);

    let mut bound = BoundState::default();
    let mut vertex_offset = 0;
    let mut index_offset = 0;

    for job in jobs.iter() {
        let count = job.sprite_count();
        let draw = DrawIndexed {
            base_vertex: 0,
            min_vertex_index: vertex_offset as u32,
            num_vertices: (count * VERTICES_PER_SPRITE) as u32,
            start_index: index_offset as u32,
            primitive_count: (count * PRIMITIVES_PER_SPRITE) as u32,
        };
        vertex_offset += count * VERTICES_PER_SPRITE;
        index_offset += count * INDICES_PER_SPRITE;

        if bound.effect_id != Some(job.effect_id) {
            bound = BoundState {
                effect_id: Some(job.effect_id),
                effect: context.resources.effect(job.effect_id),
                ..BoundState::default()
            };
            match &bound.effect {
                Some(effect) => {
                    stats.effect_binds += 1;
                    context.bind_camera(effect.as_ref(), &mut stats);
                }
                None => log::error!("Effect {:?} not found [SpriteBatcher::draw_jobs]", job.effect_id),
            }
        }
        let Some(effect) = bound.effect.clone() else {
            stats.skipped_jobs += 1;
            continue;
        };

        if bound.texture.map(|(id, _)| id) != Some(job.texture_id) {
            let handle = context.resources.texture(job.texture_id);
            if handle.is_none() {
                log::error!("Texture {:?} not found [SpriteBatcher::draw_jobs]", job.texture_id);
            }
            stats.texture_binds += 1;
            if let Err(e) = effect.set_texture(&context.uniforms.diffuse_texture, handle) {
                stats.record_failure("Set diffuse texture", &e);
            }
            bound.texture = Some((job.texture_id, handle.is_some()));
        }
        if bound.texture.is_some_and(|(_, resolved)| !resolved) {
            stats.skipped_jobs += 1;
            continue;
        }

        let alpha_bits = job.final_alpha.to_bits();
        if bound.alpha != Some(alpha_bits) {
            stats.alpha_uploads += 1;
            if let Err(e) = effect.set_float(&context.uniforms.final_alpha, job.final_alpha) {
                stats.record_failure("Set final alpha", &e);
            }
            bound.alpha = Some(alpha_bits);
        }

        draw_passes(effect.as_ref(), buffers.device.as_ref(), &draw, &mut stats);
    }

    log::trace!(
        "Drew {} jobs / {} sprites in {} calls [SpriteBatcher::draw_jobs]",
        stats.jobs,
        stats.sprites,
        stats.draw_calls
    );
    stats
}

/// Draw one viewport-covering quad through `effect` with `textures` bound
pub fn draw_full_screen_quad(
    buffers: &mut SpriteBuffers,
    context: &DrawContext<'_>,
    effect: &dyn Effect,
    textures: &[(&str, TextureHandle)],
) -> DrawStats {
    let mut stats = DrawStats {
        jobs: 1,
        sprites: 1,
        ..DrawStats::default()
    };

    let quad = builder::full_screen_quad(context.screen_width, context.screen_height);
    buffers.upload(VERTICES_PER_SPRITE, &mut stats, |out| out.copy_from_slice(&quad));
    buffers.bind(&mut stats);

    stats.effect_binds += 1;
    context.bind_camera(effect, &mut stats);
    for (name, texture) in textures {
        stats.texture_binds += 1;
        if let Err(e) = effect.set_texture(name, Some(*texture)) {
            stats.record_failure("Set post-processing texture", &e);
        }
    }

    let draw = DrawIndexed {
        base_vertex: 0,
        min_vertex_index: 0,
        num_vertices: VERTICES_PER_SPRITE as u32,
        start_index: 0,
        primitive_count: PRIMITIVES_PER_SPRITE as u32,
    };
    draw_passes(effect, buffers.device.as_ref(), &draw, &mut stats);
    stats
}
