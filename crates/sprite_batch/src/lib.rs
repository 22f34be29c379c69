//! # Sprite Batch
//!
//! The sprite batching layer of a real-time engine: per-frame 2D draw
//! requests go in, a minimal sequence of GPU draw calls comes out.
//!
//! ## Features
//!
//! - **Double-Buffered Queues**: background and foreground layers accept jobs
//!   while the previous frame's jobs are drawn
//! - **Sort-Then-Batch**: jobs are grouped by effect, texture and alpha, and
//!   state changes are only issued when they differ
//! - **Scoped GPU Objects**: buffers, declarations and locks are released on
//!   every path
//! - **Headless Backend**: run and test the renderer without a GPU
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use sprite_batch::prelude::*;
//! use sprite_batch::render::headless::{HeadlessDevice, RecordingEffect, ResourceRegistry};
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register_effect(EffectId(0), Rc::new(RecordingEffect::new("sprite", 1)));
//! registry.register_texture(TextureId(0), TextureHandle(1));
//!
//! let mut renderer = SpriteRenderer::new(SpriteRendererConfig::new(800.0, 600.0));
//! renderer.inject_resource_manager(Rc::new(registry));
//! renderer.initialize(Rc::new(HeadlessDevice::new())).unwrap();
//!
//! let sprite = Sprite::new(Vec2::new(10.0, 20.0), Vec2::new(50.0, 60.0));
//! renderer.add_render_job(RenderJob::new(TextureId(0), EffectId(0)).with_sprite(sprite));
//! renderer.render_background();
//! renderer.render_foreground();
//!
//! assert_eq!(renderer.stats(Layer::Background).draw_calls, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, Config, SpriteRendererConfig, UniformNames},
        foundation::math::{Mat4, SpriteCamera, Vec2, Vec3, Vec4},
        render::{
            api::{Effect, EffectId, GraphicsDevice, ResourceManager, TextureHandle, TextureId},
            sprites::{DrawStats, Layer, RenderJob, Sprite, SpriteRenderer},
            RenderError, RenderResult,
        },
        scene::{Behavior, BehaviorError, Entity, ShaderConstant, ShaderConstantSetter, ShaderConstantValue},
    };
}
