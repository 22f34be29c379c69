//! # Sprite Batching
//!
//! Screen-space quad rendering for backgrounds, HUDs and post-processing.
//!
//! - [`RenderJob`] / [`Sprite`]: per-frame draw requests
//! - [`LayerQueue`]: double-buffered job queue per layer
//! - [`batcher`]: sort, fill the vertex buffer, draw with minimal state changes
//! - [`SpriteRenderer`]: submission and frame entry points

pub mod batcher;
pub mod builder;
pub mod job;
pub mod queue;
pub mod renderer;
pub mod vertex;

#[cfg(test)]
mod renderer_tests;

pub use batcher::{DrawStats, SpriteBuffers};
pub use job::{Layer, RenderJob, SortKey, Sprite};
pub use queue::{JobBuffer, LayerQueue, QueueError};
pub use renderer::SpriteRenderer;
pub use vertex::{SpriteVertex, SPRITE_VERTEX_STRIDE};

/// Default sprite capacity of each queue buffer and of the GPU buffers
pub const MAX_SPRITES_PER_BATCH: usize = 10_000;
