//! # Sprite Renderer Configuration
//!
//! Configuration structures for the sprite batching layer and the
//! applications that drive it.
//!
//! ## Configuration Categories
//!
//! - **Renderer Config**: viewport, batch capacity, sprite camera depth range
//! - **Uniform Names**: effect parameter names the batcher binds
//! - **Application Config**: logging filter plus the renderer section

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::render::sprites::MAX_SPRITES_PER_BATCH;

/// Largest batch capacity addressable with 16-bit indices (4 vertices per quad)
pub const MAX_INDEXABLE_SPRITES: usize = (u16::MAX as usize + 1) / 4;

/// # Uniform Names
///
/// Effect parameter names used when binding the sprite camera, textures and
/// the per-job alpha.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformNames {
    /// Projection matrix parameter
    pub projection: String,
    /// View matrix parameter
    pub view: String,
    /// Diffuse texture sampler
    pub diffuse_texture: String,
    /// Depth texture sampler (deferred composition)
    pub depth_texture: String,
    /// Normal texture sampler (deferred composition)
    pub normal_texture: String,
    /// Per-job alpha scalar
    pub final_alpha: String,
}

impl Default for UniformNames {
    fn default() -> Self {
        Self {
            projection: "matProj".to_string(),
            view: "matView".to_string(),
            diffuse_texture: "diffuseTexture".to_string(),
            depth_texture: "depthTexture".to_string(),
            normal_texture: "normalTexture".to_string(),
            final_alpha: "finalAlpha".to_string(),
        }
    }
}

/// # Sprite Renderer Configuration
///
/// Viewport size, batch capacity and camera depth range. Changing the
/// capacity only takes effect on the next `initialize`, since both GPU
/// buffers are sized from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteRendererConfig {
    /// Viewport width in pixels
    pub screen_width: f32,
    /// Viewport height in pixels
    pub screen_height: f32,
    /// Maximum sprites held by one queue buffer (and quads in the GPU buffers)
    pub max_sprites_per_batch: usize,
    /// Near/far planes of the sprite camera
    pub depth_range: (f32, f32),
    /// Effect parameter names
    pub uniforms: UniformNames,
}

impl SpriteRendererConfig {
    /// Create a configuration for a `width` x `height` viewport
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            screen_width,
            screen_height,
            ..Self::default()
        }
    }

    /// Set batch capacity
    pub fn with_max_sprites(mut self, max_sprites: usize) -> Self {
        self.max_sprites_per_batch = max_sprites;
        self
    }

    /// Set sprite camera depth range
    pub fn with_depth_range(mut self, near: f32, far: f32) -> Self {
        self.depth_range = (near, far);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.screen_width > 0.0 && self.screen_height > 0.0) {
            return Err(ConfigError::Invalid {
                field: "screen_width/screen_height",
                reason: format!("viewport {}x{} must be positive", self.screen_width, self.screen_height),
            });
        }
        if self.max_sprites_per_batch == 0 || self.max_sprites_per_batch > MAX_INDEXABLE_SPRITES {
            return Err(ConfigError::Invalid {
                field: "max_sprites_per_batch",
                reason: format!(
                    "{} is outside 1..={MAX_INDEXABLE_SPRITES}",
                    self.max_sprites_per_batch
                ),
            });
        }
        if self.depth_range.0 >= self.depth_range.1 {
            return Err(ConfigError::Invalid {
                field: "depth_range",
                reason: format!("near {} must be below far {}", self.depth_range.0, self.depth_range.1),
            });
        }
        Ok(())
    }
}

impl Default for SpriteRendererConfig {
    fn default() -> Self {
        Self {
            screen_width: 800.0,
            screen_height: 600.0,
            max_sprites_per_batch: MAX_SPRITES_PER_BATCH,
            depth_range: (-10000.0, 10000.0),
            uniforms: UniformNames::default(),
        }
    }
}

impl Config for SpriteRendererConfig {}

/// # Complete Application Configuration
///
/// Top-level configuration for applications driving the sprite renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Renderer section
    pub renderer: SpriteRendererConfig,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            renderer: SpriteRendererConfig::default(),
        }
    }
}

impl Config for ApplicationConfig {}
