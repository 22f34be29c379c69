//! Scene entities
//!
//! Provides the entity-side collaborators of the sprite renderer:
//! - Shader constants bound per effect pass
//! - Behaviors run once per frame, failures isolated per entity

mod behavior;
mod entity;
mod shader_constants;

pub use behavior::{from_fn, Behavior, BehaviorError, FnBehavior, ScriptBehavior, ScriptHost};
pub use entity::{update_entities, Entity};
pub use shader_constants::{ShaderConstant, ShaderConstantMap, ShaderConstantSetter, ShaderConstantValue};
