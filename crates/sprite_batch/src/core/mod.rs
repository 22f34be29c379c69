//! # Core Module
//!
//! Shared configuration used by the renderer and the applications driving it.

pub mod config;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    SpriteRendererConfig,
    UniformNames,
    Config,
    ConfigError,
};
