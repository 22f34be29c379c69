//! # Sprite Renderer
//!
//! Frame-facing entry point of the sprite layer. Gameplay and UI code submit
//! [`RenderJob`]s at any point of a frame; the frame driver then calls
//! [`SpriteRenderer::render_background`] before the scene and
//! [`SpriteRenderer::render_foreground`] after it. Full-screen
//! post-processing quads bypass the queues entirely.
//!
//! Nothing here returns an error once initialized: failures are logged and
//! the frame carries on.

use std::rc::Rc;

use crate::core::config::SpriteRendererConfig;
use crate::foundation::math::SpriteCamera;
use crate::render::api::{GraphicsDevice, ResourceManager, TextureHandle};
use crate::render::RenderResult;

use super::batcher::{self, DrawContext, DrawStats, SpriteBuffers};
use super::job::{Layer, RenderJob};
use super::queue::LayerQueue;

/// Batched screen-space quad renderer with a background and a foreground layer
pub struct SpriteRenderer {
    config: SpriteRendererConfig,
    // Live viewport; zeroed by `release` while `config` keeps the configured size
    viewport: (f32, f32),
    camera: SpriteCamera,
    background: LayerQueue,
    foreground: LayerQueue,
    buffers: Option<SpriteBuffers>,
    resources: Option<Rc<dyn ResourceManager>>,
    background_stats: DrawStats,
    foreground_stats: DrawStats,
    quad_stats: DrawStats,
}

impl SpriteRenderer {
    /// Create an uninitialized renderer
    pub fn new(config: SpriteRendererConfig) -> Self {
        let capacity = config.max_sprites_per_batch;
        Self {
            camera: SpriteCamera::new(config.screen_width, config.screen_height, config.depth_range),
            background: LayerQueue::new(capacity),
            foreground: LayerQueue::new(capacity),
            buffers: None,
            resources: None,
            background_stats: DrawStats::default(),
            foreground_stats: DrawStats::default(),
            quad_stats: DrawStats::default(),
            viewport: (config.screen_width, config.screen_height),
            config,
        }
    }

    /// Create the vertex declaration, vertex buffer and index buffer
    ///
    /// Re-initializing releases the previous objects first. The viewport is
    /// restored from the configuration, so this also works after [`Self::release`].
    pub fn initialize(&mut self, device: Rc<dyn GraphicsDevice>) -> RenderResult<()> {
        self.config.validate()?;
        self.buffers = None;

        let capacity = self.config.max_sprites_per_batch;
        let buffers = SpriteBuffers::create(&device, capacity)?;

        self.background.set_capacity(capacity);
        self.foreground.set_capacity(capacity);
        self.viewport = (self.config.screen_width, self.config.screen_height);
        self.camera = SpriteCamera::new(
            self.config.screen_width,
            self.config.screen_height,
            self.config.depth_range,
        );
        self.buffers = Some(buffers);

        log::info!(
            "Sprite renderer initialized: {}x{}, {} sprites per batch",
            self.config.screen_width,
            self.config.screen_height,
            capacity
        );
        Ok(())
    }

    /// Release device objects, clear every queue and zero the viewport
    pub fn release(&mut self) {
        self.buffers = None;
        self.background.clear();
        self.foreground.clear();
        self.viewport = (0.0, 0.0);
        log::debug!("Sprite renderer released");
    }

    /// Set the resource manager used to resolve effects and textures
    pub fn inject_resource_manager(&mut self, resources: Rc<dyn ResourceManager>) {
        self.resources = Some(resources);
    }

    /// Change the viewport and rebuild the sprite camera
    pub fn set_screen_size(&mut self, width: f32, height: f32) -> RenderResult<()> {
        let mut config = self.config.clone();
        config.screen_width = width;
        config.screen_height = height;
        config.validate()?;

        self.config = config;
        self.viewport = (width, height);
        self.camera = SpriteCamera::new(width, height, self.config.depth_range);
        Ok(())
    }

    /// Queue a job for the next draw of its layer
    ///
    /// Empty jobs and jobs that would fill the layer's active buffer are
    /// dropped with a warning.
    pub fn add_render_job(&mut self, mut job: RenderJob) {
        job.rebuild_sort_key();
        let layer = job.layer;
        let queue = match layer {
            Layer::Background => &mut self.background,
            Layer::Foreground => &mut self.foreground,
        };
        if let Err(e) = queue.push(job) {
            log::warn!("{e} ({layer:?} layer) [SpriteRenderer::add_render_job]");
        }
    }

    /// Flip the background layer and draw what was queued
    pub fn render_background(&mut self) {
        self.background_stats = self.render_layer(Layer::Background);
    }

    /// Flip the foreground layer and draw what was queued
    pub fn render_foreground(&mut self) {
        self.foreground_stats = self.render_layer(Layer::Foreground);
    }

    fn render_layer(&mut self, layer: Layer) -> DrawStats {
        let queue = match layer {
            Layer::Background => &mut self.background,
            Layer::Foreground => &mut self.foreground,
        };
        let drained = queue.flip();
        if drained.is_empty() {
            return DrawStats::default();
        }

        let stats = match (self.buffers.as_mut(), self.resources.as_deref()) {
            (Some(buffers), Some(resources)) => {
                let context = DrawContext {
                    resources,
                    camera: &self.camera,
                    uniforms: &self.config.uniforms,
                    screen_width: self.viewport.0,
                    screen_height: self.viewport.1,
                };
                batcher::draw_jobs(buffers, &context, drained.jobs_mut())
            }
            (None, _) => {
                log::warn!(
                    "Renderer not initialized, dropping {} {layer:?} jobs [SpriteRenderer::render]",
                    drained.len()
                );
                DrawStats::default()
            }
            (Some(_), None) => {
                log::warn!(
                    "No resource manager, dropping {} {layer:?} jobs [SpriteRenderer::render]",
                    drained.len()
                );
                DrawStats::default()
            }
        };

        drained.clear();
        stats
    }

    /// Draw a full-screen quad with `texture` through the post-processing effect
    pub fn render_quad(&mut self, texture: TextureHandle) {
        let name = self.config.uniforms.diffuse_texture.clone();
        self.quad_stats = self.render_full_screen(&[(name.as_str(), texture)]);
    }

    /// Draw a full-screen quad with the three G-buffer textures bound
    pub fn render_deferred_quad(&mut self, diffuse: TextureHandle, depth: TextureHandle, normal: TextureHandle) {
        let uniforms = self.config.uniforms.clone();
        self.quad_stats = self.render_full_screen(&[
            (uniforms.diffuse_texture.as_str(), diffuse),
            (uniforms.depth_texture.as_str(), depth),
            (uniforms.normal_texture.as_str(), normal),
        ]);
    }

    fn render_full_screen(&mut self, textures: &[(&str, TextureHandle)]) -> DrawStats {
        let Some(buffers) = self.buffers.as_mut() else {
            log::warn!("Renderer not initialized [SpriteRenderer::render_quad]");
            return DrawStats::default();
        };
        let Some(resources) = self.resources.as_deref() else {
            log::warn!("No resource manager [SpriteRenderer::render_quad]");
            return DrawStats::default();
        };
        let Some(effect) = resources.post_processing_effect() else {
            log::error!("Post-processing effect not found [SpriteRenderer::render_quad]");
            return DrawStats::default();
        };

        let context = DrawContext {
            resources,
            camera: &self.camera,
            uniforms: &self.config.uniforms,
            screen_width: self.viewport.0,
            screen_height: self.viewport.1,
        };
        batcher::draw_full_screen_quad(buffers, &context, effect.as_ref(), textures)
    }

    /// Whether device objects exist
    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    /// Current configuration
    pub fn config(&self) -> &SpriteRendererConfig {
        &self.config
    }

    /// Viewport the next draw uses, `(0, 0)` after [`Self::release`]
    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    /// Current sprite camera
    pub fn camera(&self) -> &SpriteCamera {
        &self.camera
    }

    /// Device objects, if initialized
    pub fn buffers(&self) -> Option<&SpriteBuffers> {
        self.buffers.as_ref()
    }

    /// Queue of a layer
    pub fn queue(&self, layer: Layer) -> &LayerQueue {
        match layer {
            Layer::Background => &self.background,
            Layer::Foreground => &self.foreground,
        }
    }

    /// Sprites waiting in the active buffer of a layer
    pub fn pending_sprites(&self, layer: Layer) -> usize {
        self.queue(layer).active().sprite_count()
    }

    /// Statistics of the last draw of a layer
    pub fn stats(&self, layer: Layer) -> DrawStats {
        match layer {
            Layer::Background => self.background_stats,
            Layer::Foreground => self.foreground_stats,
        }
    }

    /// Statistics of the last full-screen quad
    pub fn quad_stats(&self) -> DrawStats {
        self.quad_stats
    }
}

impl Default for SpriteRenderer {
    fn default() -> Self {
        Self::new(SpriteRendererConfig::default())
    }
}

