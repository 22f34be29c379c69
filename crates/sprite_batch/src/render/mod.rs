//! # Rendering System
//!
//! The sprite batching layer and the seams it renders through.
//!
//! ## Architecture
//!
//! - **api**: device, effect and resource-manager traits implemented outside
//!   this crate
//! - **gpu_resources**: scoped ownership of device objects and buffer locks
//! - **sprites**: job queues, batching and the frame-facing renderer
//! - **headless**: in-memory implementations of the api traits
//!
//! Device and context creation are not part of this crate; a renderer is
//! handed an already created [`GraphicsDevice`].

pub mod api;
pub mod gpu_resources;
pub mod headless;
pub mod sprites;

pub use api::{
    DeviceError, DeviceResult, Effect, EffectId, GraphicsDevice, ResourceManager, TextureHandle,
    TextureId,
};
pub use sprites::{DrawStats, Layer, RenderJob, Sprite, SpriteRenderer, MAX_SPRITES_PER_BATCH};

use crate::config::ConfigError;

/// Result type for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors reported by the sprite renderer
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A device object could not be created or filled
    #[error("Sprite renderer initialization failed at {stage}: {source}")]
    InitializationFailed {
        /// Step that failed
        stage: &'static str,
        /// Device failure
        #[source]
        source: DeviceError,
    },

    /// Invalid configuration or viewport
    #[error("Invalid renderer configuration: {0}")]
    Config(#[from] ConfigError),
}
